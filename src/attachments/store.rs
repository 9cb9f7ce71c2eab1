//! `AttachmentStore` — async persistence seam for attachment records.

use async_trait::async_trait;
use uuid::Uuid;

use crate::attachments::model::Attachment;
use crate::error::DatabaseError;

/// Backend-agnostic store for attachment records.
///
/// `claim_redaction_link` is the durable guard against duplicate redaction
/// counterparts: it must be a compare-and-set that only links a source whose
/// link is still unset.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Insert a new record. Record invariants are checked before the write.
    async fn insert(&self, attachment: &Attachment) -> Result<(), DatabaseError>;

    /// Fetch a record by id.
    async fn get(&self, id: Uuid) -> Result<Option<Attachment>, DatabaseError>;

    /// All records belonging to a message, oldest first.
    async fn list_for_message(&self, message_id: Uuid) -> Result<Vec<Attachment>, DatabaseError>;

    /// Mark a record publicly visible. Single atomic write.
    async fn set_approved(&self, id: Uuid) -> Result<(), DatabaseError>;

    /// Overwrite a record's approval flags (used to suppress a reused
    /// redaction target and to restore it on rollback).
    async fn set_approval_flags(
        &self,
        id: Uuid,
        can_approve: bool,
        approved: bool,
    ) -> Result<(), DatabaseError>;

    /// Compare-and-set the source's `redacted` link and clear its approval
    /// flags, only where no link exists yet. Returns whether the claim won.
    async fn claim_redaction_link(
        &self,
        source_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, DatabaseError>;

    /// Restore `can_approve` and clear the link on every source whose
    /// `redacted` link points at `target_id`. Returns the number of rows
    /// fixed up.
    async fn reset_sources_of(&self, target_id: Uuid) -> Result<u64, DatabaseError>;

    /// Delete a record.
    async fn delete(&self, id: Uuid) -> Result<(), DatabaseError>;
}
