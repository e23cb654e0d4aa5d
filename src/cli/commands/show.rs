//! Show command.

use std::path::Path;

use console::style;

use crate::config::Config;
use crate::repository::SqliteMetadataRepository;

/// Print the stored record for one image.
pub fn cmd_show(
    config: &Config,
    database: Option<&Path>,
    file_path: &str,
    json: bool,
) -> anyhow::Result<()> {
    let db_path = config.database_path(database);
    if !db_path.exists() {
        anyhow::bail!(
            "metadata store {} does not exist (run `imgscribe init` or `imgscribe annotate` first)",
            db_path.display()
        );
    }

    let repo = SqliteMetadataRepository::open(&db_path)?;

    let Some(record) = repo.get(file_path)? else {
        println!("{} No record for {}", style("!").yellow(), file_path);
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("{}", style(&record.file_path).bold());
    println!("  {:<12} {}", "description", record.description);
    println!("  {:<12} {}", "tags", record.tags);
    println!("  {:<12} {}", "analyzed_at", record.analyzed_at);

    Ok(())
}
