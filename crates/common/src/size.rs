//! Byte size formatting and parsing.

use crate::error::SizeParseError;

const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

/// Format a byte count with binary units, e.g. `128.0 MiB`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value: f64 = bytes as f64;
    let mut unit: usize = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Parse a human-readable size such as `10MiB`, `5 MB`, `1g` or `4096`.
///
/// Both decimal (`KB`, `MB`, `GB`) and binary (`KiB`, `MiB`, `GiB`)
/// suffixes are accepted. Single letters (`k`, `m`, `g`, `t`) are binary.
pub fn parse_size(input: &str) -> Result<u64, SizeParseError> {
    let trimmed: &str = input.trim();
    if trimmed.is_empty() {
        return Err(SizeParseError::Empty);
    }

    let split: usize = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let value: u64 = number
        .parse()
        .map_err(|_| SizeParseError::InvalidNumber {
            input: input.to_string(),
        })?;

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "kb" => 1_000,
        "mb" => 1_000_000,
        "gb" => 1_000_000_000,
        "tb" => 1_000_000_000_000,
        "k" | "kib" => 1 << 10,
        "m" | "mib" => 1 << 20,
        "g" | "gib" => 1 << 30,
        "t" | "tib" => 1 << 40,
        other => {
            return Err(SizeParseError::UnknownUnit {
                unit: other.to_string(),
            })
        }
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| SizeParseError::Overflow {
            input: input.to_string(),
        })
}
