//! Repository layer for the keyed annotation store.
//!
//! SQLite via rusqlite. One connection is opened per run and closed when the
//! repository is dropped.

mod metadata;

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use thiserror::Error;

pub use metadata::{MetadataRecord, MetadataStore, SqliteMetadataRepository, METADATA_TABLE};

/// Errors from the keyed store.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("cannot create database directory: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Open a SQLite connection, creating the file and its directory if needed.
pub fn connect(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(db_path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(conn)
}

/// Convert a `QueryReturnedNoRows` into `None`.
pub(crate) fn to_option<T>(result: rusqlite::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
