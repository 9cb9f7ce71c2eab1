//! Attachment publication — records, persistence, and the approval/redaction
//! workflow.

pub mod files;
pub mod libsql_store;
pub mod model;
pub mod store;
pub mod workflow;

pub use files::{FileStore, LocalFileStore};
pub use libsql_store::LibSqlAttachmentStore;
pub use model::{Attachment, AttachmentState, redacted_name};
pub use store::AttachmentStore;
pub use workflow::{
    Actor, ApproveOutcome, Authorizer, MessageScope, PublicationWorkflow, RedactionHandle,
    RedactionRunner, RequestScope,
};
