//! Multipart upload session records.
//!
//! A session is the caller-held record of an open multipart upload: the
//! service-assigned upload ID, where the object goes, how the payload was
//! split, and what happened to each part. It serializes so a caller can
//! persist it and resume from another process.

use serde::{Deserialize, Serialize};

use crate::parts::PartPlan;
use crate::traits::{CommittedPart, UploadedPart};
use crate::types::ObjectTarget;

/// Upload state of a single part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartStatus {
    Pending,
    InFlight,
    Done,
    Failed,
}

/// Overall state of a multipart session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Open; parts may still be uploaded.
    Active,
    /// Committed into the final object.
    Completed,
    /// Explicitly aborted on the service.
    Aborted,
    /// A part failed; the session can be resumed.
    ResumableFailed,
}

/// One part of a multipart session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPart {
    /// 1-based part number.
    pub number: u32,
    /// Byte offset within the source.
    pub offset: u64,
    /// Part length in bytes.
    pub length: u64,
    /// Base64 MD5 of the content, once computed.
    pub md5: Option<String>,
    /// ETag from the service, once acknowledged.
    pub etag: Option<String>,
    /// Upload state.
    pub status: PartStatus,
}

impl UploadPart {
    fn pending(plan: PartPlan) -> Self {
        Self {
            number: plan.number,
            offset: plan.offset,
            length: plan.length,
            md5: None,
            etag: None,
            status: PartStatus::Pending,
        }
    }
}

/// Record of an open (or finished) multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipartUploadSession {
    upload_id: String,
    target: ObjectTarget,
    part_size: u64,
    total_length: Option<u64>,
    parts: Vec<UploadPart>,
    status: SessionStatus,
}

impl MultipartUploadSession {
    /// Create a session record for a freshly assigned upload ID.
    pub fn new(
        upload_id: impl Into<String>,
        target: ObjectTarget,
        part_size: u64,
        total_length: Option<u64>,
    ) -> Self {
        Self {
            upload_id: upload_id.into(),
            target,
            part_size,
            total_length,
            parts: Vec::new(),
            status: SessionStatus::Active,
        }
    }

    /// Rebuild a session record from an upload ID alone.
    ///
    /// Use this to resume an upload whose record was lost; the part size
    /// must match the one the upload was started with.
    pub fn for_upload_id(target: ObjectTarget, upload_id: impl Into<String>, part_size: u64) -> Self {
        Self::new(upload_id, target, part_size, None)
    }

    /// Service-assigned upload ID. Fixed for the life of the session.
    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    /// Destination object.
    pub fn target(&self) -> &ObjectTarget {
        &self.target
    }

    /// Part size the payload was split with.
    pub fn part_size(&self) -> u64 {
        self.part_size
    }

    /// Total payload length, when known.
    pub fn total_length(&self) -> Option<u64> {
        self.total_length
    }

    /// Parts in ascending part-number order.
    pub fn parts(&self) -> &[UploadPart] {
        &self.parts
    }

    /// Look up a part by number.
    pub fn part(&self, number: u32) -> Option<&UploadPart> {
        self.index_of(number).ok().map(|i| &self.parts[i])
    }

    /// Current session state.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Whether the part is acknowledged and must not be sent again.
    pub fn is_done(&self, number: u32) -> bool {
        self.part(number)
            .is_some_and(|p| p.status == PartStatus::Done)
    }

    /// Numbers of all acknowledged parts, ascending.
    pub fn done_part_numbers(&self) -> Vec<u32> {
        self.parts
            .iter()
            .filter(|p| p.status == PartStatus::Done)
            .map(|p| p.number)
            .collect()
    }

    /// Acknowledged parts as commit entries, ascending.
    pub fn committed_parts(&self) -> Vec<CommittedPart> {
        self.parts
            .iter()
            .filter(|p| p.status == PartStatus::Done)
            .filter_map(|p| {
                p.etag.as_ref().map(|etag| CommittedPart {
                    part_number: p.number,
                    etag: etag.clone(),
                })
            })
            .collect()
    }

    pub(crate) fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
    }

    pub(crate) fn set_total_length(&mut self, length: u64) {
        self.total_length = Some(length);
    }

    /// Start tracking a part; existing entries are left untouched.
    pub(crate) fn track(&mut self, plan: PartPlan) {
        if let Err(index) = self.index_of(plan.number) {
            self.parts.insert(index, UploadPart::pending(plan));
        }
    }

    /// Record a part the service reported as already stored.
    pub(crate) fn record_acknowledged(&mut self, plan: PartPlan, uploaded: &UploadedPart) {
        let part = UploadPart {
            md5: uploaded.md5.clone(),
            etag: Some(uploaded.etag.clone()),
            status: PartStatus::Done,
            ..UploadPart::pending(plan)
        };
        self.upsert(part);
    }

    pub(crate) fn mark_in_flight(&mut self, plan: PartPlan, md5: &str) {
        let part = UploadPart {
            md5: Some(md5.to_string()),
            status: PartStatus::InFlight,
            ..UploadPart::pending(plan)
        };
        self.upsert(part);
    }

    pub(crate) fn mark_done(&mut self, number: u32, etag: String) {
        if let Ok(index) = self.index_of(number) {
            let part = &mut self.parts[index];
            part.etag = Some(etag);
            part.status = PartStatus::Done;
        }
    }

    pub(crate) fn mark_failed(&mut self, number: u32) {
        if let Ok(index) = self.index_of(number) {
            let part = &mut self.parts[index];
            part.etag = None;
            part.status = PartStatus::Failed;
        }
    }

    /// Drop parts beyond the last part of the payload.
    pub(crate) fn truncate_parts(&mut self, last_part: u32) {
        self.parts.retain(|p| p.number <= last_part);
    }

    fn upsert(&mut self, part: UploadPart) {
        match self.index_of(part.number) {
            Ok(index) => self.parts[index] = part,
            Err(index) => self.parts.insert(index, part),
        }
    }

    fn index_of(&self, number: u32) -> Result<usize, usize> {
        self.parts.binary_search_by_key(&number, |p| p.number)
    }
}
