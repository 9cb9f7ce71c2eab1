//! libSQL backend — async `AttachmentStore` implementation.
//!
//! Supports local file and in-memory databases. The schema is created at
//! open time.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;
use uuid::Uuid;

use crate::attachments::model::Attachment;
use crate::attachments::store::AttachmentStore;
use crate::error::DatabaseError;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS attachments (
        id TEXT PRIMARY KEY,
        message_id TEXT NOT NULL,
        name TEXT NOT NULL,
        filetype TEXT NOT NULL,
        file_path TEXT,
        is_redacted INTEGER NOT NULL DEFAULT 0,
        redacted_id TEXT,
        can_approve INTEGER NOT NULL DEFAULT 1,
        approved INTEGER NOT NULL DEFAULT 0,
        can_delete INTEGER NOT NULL DEFAULT 1,
        can_redact INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_attachments_message ON attachments(message_id);
    CREATE INDEX IF NOT EXISTS idx_attachments_redacted ON attachments(redacted_id);
"#;

const COLUMNS: &str = "id, message_id, name, filetype, file_path, is_redacted, redacted_id, \
     can_approve, approved, can_delete, can_redact, created_at, updated_at";

/// libSQL attachment store.
///
/// Holds a single connection reused for all operations; `libsql::Connection`
/// is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlAttachmentStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlAttachmentStore {
    /// Open (or create) a local database file.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        info!(path = %path.display(), "Attachment database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to create in-memory database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(SCHEMA)
            .await
            .map_err(|e| DatabaseError::Migration(format!("init_schema: {e}")))?;
        Ok(())
    }
}

/// Map a libsql row to an Attachment. Column order matches `COLUMNS`.
fn row_to_attachment(row: &libsql::Row) -> Result<Attachment, DatabaseError> {
    let parse = |e: libsql::Error| DatabaseError::Query(format!("attachment row parse: {e}"));

    let id_str: String = row.get(0).map_err(parse)?;
    let message_id_str: String = row.get(1).map_err(parse)?;
    let name: String = row.get(2).map_err(parse)?;
    let filetype: String = row.get(3).map_err(parse)?;
    let file_path: Option<String> = row.get(4).map_err(parse)?;
    let is_redacted: i64 = row.get(5).map_err(parse)?;
    let redacted_str: Option<String> = row.get(6).map_err(parse)?;
    let can_approve: i64 = row.get(7).map_err(parse)?;
    let approved: i64 = row.get(8).map_err(parse)?;
    let can_delete: i64 = row.get(9).map_err(parse)?;
    let can_redact: i64 = row.get(10).map_err(parse)?;
    let created_str: String = row.get(11).map_err(parse)?;
    let updated_str: String = row.get(12).map_err(parse)?;

    let parse_uuid = |s: &str| {
        Uuid::parse_str(s).map_err(|e| DatabaseError::Query(format!("invalid uuid {s}: {e}")))
    };
    let parse_dt = |s: &str| {
        chrono::DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| DatabaseError::Query(format!("invalid timestamp {s}: {e}")))
    };

    Ok(Attachment {
        id: parse_uuid(&id_str)?,
        message_id: parse_uuid(&message_id_str)?,
        name,
        filetype,
        file_path,
        is_redacted: is_redacted != 0,
        redacted: redacted_str.as_deref().map(parse_uuid).transpose()?,
        can_approve: can_approve != 0,
        approved: approved != 0,
        can_delete: can_delete != 0,
        can_redact: can_redact != 0,
        created_at: parse_dt(&created_str)?,
        updated_at: parse_dt(&updated_str)?,
    })
}

#[async_trait]
impl AttachmentStore for LibSqlAttachmentStore {
    async fn insert(&self, attachment: &Attachment) -> Result<(), DatabaseError> {
        attachment.validate()?;
        self.conn
            .execute(
                "INSERT INTO attachments (id, message_id, name, filetype, file_path, \
                 is_redacted, redacted_id, can_approve, approved, can_delete, can_redact, \
                 created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    attachment.id.to_string(),
                    attachment.message_id.to_string(),
                    attachment.name.clone(),
                    attachment.filetype.clone(),
                    attachment.file_path.clone(),
                    attachment.is_redacted as i64,
                    attachment.redacted.map(|u| u.to_string()),
                    attachment.can_approve as i64,
                    attachment.approved as i64,
                    attachment.can_delete as i64,
                    attachment.can_redact as i64,
                    attachment.created_at.to_rfc3339(),
                    attachment.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert attachment: {e}")))?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Attachment>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {COLUMNS} FROM attachments WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get attachment: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("get attachment: {e}")))?
        {
            Some(row) => Ok(Some(row_to_attachment(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_for_message(&self, message_id: Uuid) -> Result<Vec<Attachment>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {COLUMNS} FROM attachments WHERE message_id = ?1 ORDER BY created_at"
                ),
                params![message_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list attachments: {e}")))?;

        let mut out = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            out.push(row_to_attachment(&row)?);
        }
        Ok(out)
    }

    async fn set_approved(&self, id: Uuid) -> Result<(), DatabaseError> {
        let changed = self
            .conn
            .execute(
                "UPDATE attachments SET approved = 1, updated_at = ?2 WHERE id = ?1",
                params![id.to_string(), Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_approved: {e}")))?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "attachment".into(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn set_approval_flags(
        &self,
        id: Uuid,
        can_approve: bool,
        approved: bool,
    ) -> Result<(), DatabaseError> {
        let changed = self
            .conn
            .execute(
                "UPDATE attachments SET can_approve = ?2, approved = ?3, updated_at = ?4 \
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    can_approve as i64,
                    approved as i64,
                    Utc::now().to_rfc3339()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_approval_flags: {e}")))?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "attachment".into(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn claim_redaction_link(
        &self,
        source_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, DatabaseError> {
        let changed = self
            .conn
            .execute(
                "UPDATE attachments SET redacted_id = ?2, can_approve = 0, approved = 0, \
                 updated_at = ?3 WHERE id = ?1 AND redacted_id IS NULL",
                params![
                    source_id.to_string(),
                    target_id.to_string(),
                    Utc::now().to_rfc3339()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("claim_redaction_link: {e}")))?;
        Ok(changed > 0)
    }

    async fn reset_sources_of(&self, target_id: Uuid) -> Result<u64, DatabaseError> {
        self.conn
            .execute(
                "UPDATE attachments SET can_approve = 1, redacted_id = NULL, updated_at = ?2 \
                 WHERE redacted_id = ?1",
                params![target_id.to_string(), Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("reset_sources_of: {e}")))
    }

    async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "DELETE FROM attachments WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete attachment: {e}")))?;
        Ok(())
    }
}
