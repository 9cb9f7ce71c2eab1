//! Stored-file removal seam.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::attachments::model::Attachment;

/// Deletes the stored bytes behind an attachment record.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn remove(&self, attachment: &Attachment) -> io::Result<()>;
}

/// Filesystem-backed store rooted at a media directory.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn remove(&self, attachment: &Attachment) -> io::Result<()> {
        let Some(rel) = &attachment.file_path else {
            // Never materialized (e.g. a redaction target the job did not
            // populate yet) — nothing to remove.
            return Ok(());
        };
        let full = self.root.join(rel);
        match tokio::fs::remove_file(&full).await {
            Ok(()) => {
                debug!(path = %full.display(), "Removed attachment file");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
