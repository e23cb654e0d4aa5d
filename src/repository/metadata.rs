//! Metadata repository: one row per image, keyed by file path.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::debug;

use super::{to_option, Result};
use crate::models::AnnotationResult;

pub const METADATA_TABLE: &str = "metadata";

/// A row of the `metadata` table, with tags already flattened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataRecord {
    pub file_path: String,
    pub description: String,
    pub tags: String,
    pub analyzed_at: String,
}

impl From<&AnnotationResult> for MetadataRecord {
    fn from(result: &AnnotationResult) -> Self {
        Self {
            file_path: result.file_path.clone(),
            description: result.description.clone(),
            tags: result.tags_joined(),
            analyzed_at: result.analyzed_at_iso(),
        }
    }
}

/// A keyed sink for annotation results.
pub trait MetadataStore: Send {
    /// Create the backing table if it does not exist.
    fn ensure_schema(&self) -> Result<()>;

    /// Insert the result, or replace the existing row for its path.
    fn upsert(&self, result: &AnnotationResult) -> Result<()>;
}

/// SQLite-backed metadata store.
pub struct SqliteMetadataRepository {
    db_path: PathBuf,
    conn: Connection,
}

impl SqliteMetadataRepository {
    /// Open (or create) the database at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = super::connect(db_path)?;
        debug!("Opened metadata store {}", db_path.display());
        Ok(Self {
            db_path: db_path.to_path_buf(),
            conn,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Get the current record for a path.
    pub fn get(&self, file_path: &str) -> Result<Option<MetadataRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT file_path, description, tags, analyzed_at FROM metadata WHERE file_path = ?",
        )?;

        to_option(stmt.query_row(params![file_path], |row| {
            Ok(MetadataRecord {
                file_path: row.get("file_path")?,
                description: row.get::<_, Option<String>>("description")?.unwrap_or_default(),
                tags: row.get::<_, Option<String>>("tags")?.unwrap_or_default(),
                analyzed_at: row.get::<_, Option<String>>("analyzed_at")?.unwrap_or_default(),
            })
        }))
    }

    /// Count stored records.
    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM metadata", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl MetadataStore for SqliteMetadataRepository {
    fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS metadata (
                file_path TEXT PRIMARY KEY,
                description TEXT,
                tags TEXT,
                analyzed_at TEXT
            );
        "#,
        )?;
        Ok(())
    }

    fn upsert(&self, result: &AnnotationResult) -> Result<()> {
        let record = MetadataRecord::from(result);

        self.conn.execute(
            r#"
            INSERT INTO metadata (file_path, description, tags, analyzed_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(file_path) DO UPDATE SET
                description = excluded.description,
                tags = excluded.tags,
                analyzed_at = excluded.analyzed_at
            "#,
            params![
                record.file_path,
                record.description,
                record.tags,
                record.analyzed_at,
            ],
        )?;

        Ok(())
    }
}
