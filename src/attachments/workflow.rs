//! Attachment publication workflow — approval, redaction requests, deletion.
//!
//! Operations serialize per attachment id so two concurrent calls on the
//! same attachment cannot interleave their read-modify-write sequences.
//! The `redacted` link is additionally guarded by a compare-and-set in the
//! store, which is what makes counterpart creation idempotent.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::attachments::files::FileStore;
use crate::attachments::model::Attachment;
use crate::attachments::store::AttachmentStore;
use crate::error::{AttachmentError, DatabaseError, RunnerError};

/// The parent FOI request as the workflow sees it.
#[derive(Debug, Clone)]
pub struct RequestScope {
    pub request_id: Uuid,
    /// Requests flagged not publishable can never have attachments approved.
    pub not_publishable: bool,
}

/// The message owning an attachment.
#[derive(Debug, Clone)]
pub struct MessageScope {
    pub message_id: Uuid,
    /// Manually uploaded (postal) rather than received over an automated
    /// channel. Only attachments on manual messages may be deleted.
    pub manually_added: bool,
}

/// Who is performing the operation.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: Uuid,
    pub is_staff: bool,
}

/// Result of an approval attempt that did not error.
///
/// The not-publishable hard guard is a distinct variant rather than a
/// silent success, so callers can tell the two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApproveOutcome {
    Applied,
    SkippedNotPublishable,
}

/// Tracking reference for a submitted redaction job.
#[derive(Debug, Clone)]
pub struct RedactionHandle {
    /// The counterpart record the job will populate.
    pub attachment_id: Uuid,
    pub url: String,
}

/// External authorization check.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn can_write(&self, request_id: Uuid, actor: &Actor) -> bool;
}

/// External redaction job runner. Instructions are opaque and passed
/// through verbatim; results arrive later over a separate channel.
#[async_trait]
pub trait RedactionRunner: Send + Sync {
    async fn submit(
        &self,
        source_id: Uuid,
        target_id: Uuid,
        instructions: &Value,
    ) -> Result<(), RunnerError>;
}

/// Governs how an attachment moves from private upload to redacted copy to
/// published document.
pub struct PublicationWorkflow {
    store: Arc<dyn AttachmentStore>,
    authorizer: Arc<dyn Authorizer>,
    runner: Arc<dyn RedactionRunner>,
    files: Arc<dyn FileStore>,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl PublicationWorkflow {
    pub fn new(
        store: Arc<dyn AttachmentStore>,
        authorizer: Arc<dyn Authorizer>,
        runner: Arc<dyn RedactionRunner>,
        files: Arc<dyn FileStore>,
    ) -> Self {
        Self {
            store,
            authorizer,
            runner,
            files,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Per-attachment lock. Entries live for the process lifetime; the
    /// working set is small enough not to bother pruning.
    async fn lock_for(&self, id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(id).or_default())
    }

    async fn authorize(
        &self,
        scope: &RequestScope,
        actor: &Actor,
    ) -> Result<(), AttachmentError> {
        if self.authorizer.can_write(scope.request_id, actor).await {
            Ok(())
        } else {
            Err(AttachmentError::PermissionDenied {
                request_id: scope.request_id,
            })
        }
    }

    async fn fetch(&self, id: Uuid) -> Result<Attachment, AttachmentError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| {
                AttachmentError::Database(DatabaseError::NotFound {
                    entity: "attachment".into(),
                    id: id.to_string(),
                })
            })
    }

    /// Mark an attachment publicly visible.
    ///
    /// The not-publishable guard is enforced here, not at the caller: no
    /// attachment is ever approved on such a request, regardless of actor
    /// privileges. The check-and-write runs under the per-attachment lock.
    pub async fn approve(
        &self,
        scope: &RequestScope,
        attachment_id: Uuid,
        actor: &Actor,
    ) -> Result<ApproveOutcome, AttachmentError> {
        self.authorize(scope, actor).await?;

        let lock = self.lock_for(attachment_id).await;
        let _guard = lock.lock().await;

        let attachment = self.fetch(attachment_id).await?;
        if !attachment.can_approve && !actor.is_staff {
            return Err(AttachmentError::InvalidState {
                id: attachment_id,
                reason: "attachment cannot be approved".into(),
            });
        }

        if scope.not_publishable {
            debug!(
                attachment = %attachment_id,
                request = %scope.request_id,
                "Approval skipped: request is not publishable"
            );
            return Ok(ApproveOutcome::SkippedNotPublishable);
        }

        self.store.set_approved(attachment_id).await?;
        info!(attachment = %attachment_id, "Attachment approved");
        Ok(ApproveOutcome::Applied)
    }

    /// Request a redacted copy of an attachment.
    ///
    /// The counterpart record is created at most once per source; repeat
    /// requests reuse it. Target persistence and job submission form one
    /// unit: a failed submission rolls the target back and leaves the
    /// source untouched. The source's link and flag suppression are in
    /// place before this returns, so a concurrent approval issued after
    /// return is guaranteed to be rejected. Losing the link claim to
    /// another workflow instance discards the fresh counterpart and
    /// returns the winner's handle instead.
    pub async fn request_redaction(
        &self,
        scope: &RequestScope,
        attachment_id: Uuid,
        actor: &Actor,
        instructions: &Value,
    ) -> Result<RedactionHandle, AttachmentError> {
        self.authorize(scope, actor).await?;

        let lock = self.lock_for(attachment_id).await;
        let _guard = lock.lock().await;

        let source = self.fetch(attachment_id).await?;
        if !source.can_redact {
            return Err(AttachmentError::InvalidState {
                id: attachment_id,
                reason: "attachment cannot be redacted".into(),
            });
        }

        // A prior counterpart is reused; a redacted copy is its own target
        // for further redaction passes.
        let existing = if let Some(target_id) = source.redacted {
            Some(self.fetch(target_id).await?)
        } else if source.is_redacted {
            Some(source.clone())
        } else {
            None
        };

        let target = match &existing {
            Some(prior) => {
                // A fresh job is pending; the target goes back to suppressed
                // until it completes.
                self.store.set_approval_flags(prior.id, false, false).await?;
                prior.clone()
            }
            None => {
                let target = Attachment::new_redaction_target(&source);
                self.store.insert(&target).await?;
                target
            }
        };

        if let Err(e) = self
            .runner
            .submit(source.id, target.id, instructions)
            .await
        {
            match &existing {
                Some(prior) => {
                    self.store
                        .set_approval_flags(prior.id, prior.can_approve, prior.approved)
                        .await?;
                }
                None => {
                    self.store.delete(target.id).await?;
                }
            }
            warn!(
                attachment = %attachment_id,
                error = %e,
                "Redaction job submission failed, rolled back"
            );
            return Err(AttachmentError::Dependency(e.to_string()));
        }

        if !source.is_redacted && source.redacted.is_none() {
            let claimed = self.store.claim_redaction_link(source.id, target.id).await?;
            if !claimed {
                // Another workflow over the same store linked a counterpart
                // first. Exactly one counterpart may exist per source, so
                // ours is discarded and the caller gets the winner's handle.
                self.store.delete(target.id).await?;
                let winner_id = self.fetch(source.id).await?.redacted.ok_or_else(|| {
                    AttachmentError::Database(DatabaseError::Constraint(
                        "redaction link missing after lost claim".into(),
                    ))
                })?;
                let winner = self.fetch(winner_id).await?;
                debug!(
                    attachment = %attachment_id,
                    winner = %winner.id,
                    "Redaction link already claimed, reusing existing counterpart"
                );
                return Ok(RedactionHandle {
                    attachment_id: winner.id,
                    url: winner.canonical_url(),
                });
            }
        }

        info!(
            attachment = %attachment_id,
            target = %target.id,
            "Redaction job submitted"
        );
        Ok(RedactionHandle {
            attachment_id: target.id,
            url: target.canonical_url(),
        })
    }

    /// Delete an attachment record and its stored file.
    ///
    /// Deleting a redacted copy first restores `can_approve` on every
    /// source that pointed at it — the original becomes approvable again
    /// once its counterpart is gone.
    pub async fn delete(
        &self,
        scope: &RequestScope,
        message: &MessageScope,
        attachment_id: Uuid,
        actor: &Actor,
    ) -> Result<(), AttachmentError> {
        self.authorize(scope, actor).await?;

        if !message.manually_added {
            return Err(AttachmentError::InvalidState {
                id: attachment_id,
                reason: "only attachments of manually added messages can be deleted".into(),
            });
        }

        let lock = self.lock_for(attachment_id).await;
        let _guard = lock.lock().await;

        let attachment = self.fetch(attachment_id).await?;
        if !attachment.can_delete {
            return Err(AttachmentError::InvalidState {
                id: attachment_id,
                reason: "attachment cannot be deleted".into(),
            });
        }

        if attachment.is_redacted {
            let fixed = self.store.reset_sources_of(attachment.id).await?;
            if fixed > 0 {
                debug!(
                    attachment = %attachment_id,
                    sources = fixed,
                    "Restored approvability on sources of deleted redaction"
                );
            }
        }

        self.files.remove(&attachment).await?;
        self.store.delete(attachment.id).await?;
        info!(attachment = %attachment_id, "Attachment deleted");
        Ok(())
    }
}
