//! Initialize command.

use std::path::Path;

use console::style;

use crate::config::Config;
use crate::repository::{MetadataStore, SqliteMetadataRepository, METADATA_TABLE};

/// Create the keyed store and its table.
pub fn cmd_init(config: &Config, database: Option<&Path>) -> anyhow::Result<()> {
    let db_path = config.database_path(database);

    let repo = SqliteMetadataRepository::open(&db_path)?;
    repo.ensure_schema()?;

    println!(
        "{} Initialized {} table in {} ({} records)",
        style("✓").green(),
        METADATA_TABLE,
        db_path.display(),
        repo.count()?
    );

    Ok(())
}
