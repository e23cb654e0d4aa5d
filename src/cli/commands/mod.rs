//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod annotate;
mod helpers;
mod init;
mod show;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Config, RunOverrides};

#[derive(Parser)]
#[command(name = "imgscribe")]
#[command(about = "Describe and tag a folder of images with a vision model")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to ./imgscribe.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate every JPEG/PNG under a folder and export the results
    Annotate {
        /// Folder to scan for images
        #[arg(env = "IMAGE_FOLDER_PATH")]
        root: Option<PathBuf>,
        /// CSV file to write (recreated on every run)
        #[arg(short, long, env = "OUTPUT_CSV_PATH")]
        output: Option<PathBuf>,
        /// SQLite database for the keyed store
        #[arg(long, env = "METADATA_DB_PATH")]
        database: Option<PathBuf>,
        /// Export to CSV only; skip the keyed store (wins over --database)
        #[arg(long)]
        no_db: bool,
        /// Model to use (overrides config)
        #[arg(long)]
        model: Option<String>,
        /// API endpoint (overrides config)
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Create the keyed store and its table
    Init {
        /// SQLite database for the keyed store
        #[arg(long, env = "METADATA_DB_PATH")]
        database: Option<PathBuf>,
    },

    /// Show the stored record for one image
    Show {
        /// File path as it appears in the export
        file_path: String,
        /// SQLite database for the keyed store
        #[arg(long, env = "METADATA_DB_PATH")]
        database: Option<PathBuf>,
        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Annotate {
            root,
            output,
            database,
            no_db,
            model,
            endpoint,
        } => {
            let overrides = RunOverrides {
                root,
                output,
                database,
                no_db,
                endpoint,
                model,
            };
            annotate::cmd_annotate(&config, &overrides).await
        }
        Commands::Init { database } => init::cmd_init(&config, database.as_deref()),
        Commands::Show {
            file_path,
            database,
            json,
        } => show::cmd_show(&config, database.as_deref(), &file_path, json),
    }
}
