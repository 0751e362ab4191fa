//! Shared error types used across objstore-transfer crates.

use thiserror::Error;

/// Failure to parse a human-readable byte size such as `128MiB`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SizeParseError {
    /// Input was empty or whitespace.
    #[error("Size value is empty")]
    Empty,

    /// Numeric portion could not be parsed.
    #[error("Invalid size number in '{input}'")]
    InvalidNumber {
        /// The rejected input.
        input: String,
    },

    /// Unit suffix is not one we know.
    #[error("Unknown size unit '{unit}'")]
    UnknownUnit {
        /// The rejected suffix.
        unit: String,
    },

    /// Value does not fit in 64 bits.
    #[error("Size '{input}' is too large")]
    Overflow {
        /// The rejected input.
        input: String,
    },
}
