//! Error types for foidesk.

use uuid::Uuid;

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Attachment error: {0}")]
    Attachment(#[from] AttachmentError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Mail parsing errors.
///
/// A malformed DSN `Status:` value is deliberately NOT an error —
/// classification degrades to "unknown" when the field fails the code pattern.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Message could not be parsed as MIME")]
    UnsupportedFormat,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Attachment workflow errors.
#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("Write access denied on request {request_id}")]
    PermissionDenied { request_id: Uuid },

    #[error("Attachment {id} is not eligible: {reason}")]
    InvalidState { id: Uuid, reason: String },

    #[error("Redaction job submission failed: {0}")]
    Dependency(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Stored file removal failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Error reported by a redaction job runner when a submission is refused.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct RunnerError(pub String);

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
