//! Attachment records and publication state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DatabaseError;

/// A file belonging to a message on an FOI request.
///
/// An attachment and its redacted counterpart are two independent records
/// linked by the `redacted` id field on the original — there is no pointer
/// cycle. The redacted output itself never carries a link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub message_id: Uuid,
    pub name: String,
    pub filetype: String,
    /// Relative path of the stored bytes, when materialized.
    pub file_path: Option<String>,
    /// True if this record IS a redacted output.
    pub is_redacted: bool,
    /// Forward link to the redacted counterpart, set at most once.
    pub redacted: Option<Uuid>,
    pub can_approve: bool,
    /// Publicly visible. Only ever set through the approval operation.
    pub approved: bool,
    pub can_delete: bool,
    pub can_redact: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where an attachment stands in the publication lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentState {
    /// Uploaded, not publicly visible.
    Private,
    /// Publicly visible.
    Approved,
    /// A redacted counterpart exists but is not yet ready.
    RedactionRequested,
    /// Suppressed in favor of a navigable redacted counterpart.
    Superseded,
}

impl Attachment {
    /// A fresh inbound attachment with default eligibility flags.
    pub fn new(message_id: Uuid, name: impl Into<String>, filetype: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            message_id,
            name: name.into(),
            filetype: filetype.into(),
            file_path: None,
            is_redacted: false,
            redacted: None,
            can_approve: true,
            approved: false,
            can_delete: true,
            can_redact: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// The counterpart record created when redaction is first requested.
    ///
    /// Starts suppressed; the external job populates its content later.
    pub fn new_redaction_target(source: &Attachment) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            message_id: source.message_id,
            name: redacted_name(&source.name),
            filetype: "application/pdf".to_string(),
            file_path: None,
            is_redacted: true,
            redacted: None,
            can_approve: false,
            approved: false,
            can_delete: true,
            can_redact: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Derive the lifecycle state. `counterpart_ready` says whether the
    /// linked redacted output has been populated by the job.
    pub fn state(&self, counterpart_ready: bool) -> AttachmentState {
        if self.approved {
            AttachmentState::Approved
        } else if self.redacted.is_some() {
            if counterpart_ready {
                AttachmentState::Superseded
            } else {
                AttachmentState::RedactionRequested
            }
        } else {
            AttachmentState::Private
        }
    }

    /// Canonical URL a caller can hand out as a tracking reference.
    pub fn canonical_url(&self) -> String {
        format!("/messages/{}/attachments/{}", self.message_id, self.name)
    }

    /// Check the record invariants before persisting.
    pub fn validate(&self) -> Result<(), DatabaseError> {
        if self.is_redacted && self.redacted.is_some() {
            return Err(DatabaseError::Constraint(
                "a redacted output cannot carry a redacted link".into(),
            ));
        }
        if self.redacted.is_some() && (self.can_approve || self.approved) {
            return Err(DatabaseError::Constraint(
                "an original with a redacted counterpart must stay suppressed".into(),
            ));
        }
        Ok(())
    }
}

/// Derive the counterpart name: strip the extension, drop characters outside
/// `[A-Za-z0-9_.-]`, append `_redacted.pdf`.
pub fn redacted_name(name: &str) -> String {
    let base = name.rsplit_once('.').map(|(b, _)| b).unwrap_or(name);
    let sanitized: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    format!("{sanitized}_redacted.pdf")
}
