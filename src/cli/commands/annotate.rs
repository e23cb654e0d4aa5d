//! Annotate command.

use std::time::Duration;

use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use crate::config::{Config, RunOverrides, Settings};
use crate::discovery::ImageLocator;
use crate::export::CsvExporter;
use crate::llm::VisionClient;
use crate::repository::{MetadataStore, SqliteMetadataRepository};
use crate::services::{AnnotationEvent, AnnotationService, ResultSinks, RunSummary};

use super::helpers::truncate;

/// Annotate every image under the configured root.
pub async fn cmd_annotate(config: &Config, overrides: &RunOverrides) -> anyhow::Result<()> {
    let settings = Settings::resolve(config, overrides)?;

    let locator = ImageLocator::new(&settings.image_root)?;

    let mut exporter = CsvExporter::create(&settings.export_path)?;

    let store = match settings.database_path {
        Some(ref path) => {
            let repo = SqliteMetadataRepository::open(path)
                .with_context(|| format!("failed to open metadata store {}", path.display()))?;
            repo.ensure_schema()
                .with_context(|| format!("failed to prepare metadata store {}", path.display()))?;
            Some(repo)
        }
        None => None,
    };

    let client = VisionClient::new(settings.llm.clone())?;

    println!(
        "{} Annotating images in {} (model: {})",
        style("→").cyan(),
        settings.image_root.display(),
        client.config().model
    );

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AnnotationEvent>();

    // Spawn event handler for UI
    let event_handler = tokio::spawn(async move {
        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos} images {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        progress.enable_steady_tick(Duration::from_millis(120));
        progress.set_message("Scanning...");

        while let Some(event) = event_rx.recv().await {
            match event {
                AnnotationEvent::ImageStarted { file_path } => {
                    progress.set_message(truncate(&file_path, 60));
                }
                AnnotationEvent::ImageCompleted { .. } => {
                    progress.inc(1);
                }
                AnnotationEvent::ImageSkipped {
                    file_path,
                    stage,
                    error,
                } => {
                    progress.println(format!(
                        "{} {} ({}): {}",
                        style("✗").red(),
                        file_path,
                        stage,
                        error
                    ));
                    progress.inc(1);
                }
                AnnotationEvent::StoreFailed { file_path, error } => {
                    progress.println(format!(
                        "{} {} exported but not stored: {}",
                        style("!").yellow(),
                        file_path,
                        error
                    ));
                }
                AnnotationEvent::Complete(_) => {
                    progress.finish_and_clear();
                }
            }
        }
        progress.finish_and_clear();
    });

    let service = AnnotationService::new(client);
    let outcome = {
        let mut sinks = ResultSinks {
            export: &mut exporter,
            store: store.as_ref().map(|s| s as &dyn MetadataStore),
        };

        tokio::select! {
            summary = service.annotate_all(locator, &mut sinks, &event_tx) => Some(summary),
            _ = tokio::signal::ctrl_c() => None,
        }
    };

    drop(event_tx);
    let _ = event_handler.await;

    let rows = exporter.finish()?;

    report_outcome(outcome, rows, &settings)
}

/// Print the end-of-run report. An interrupted run is an error so the
/// process exits non-zero.
fn report_outcome(
    outcome: Option<RunSummary>,
    rows: usize,
    settings: &Settings,
) -> anyhow::Result<()> {
    match outcome {
        Some(summary) => {
            print_summary(&summary, settings);
            Ok(())
        }
        None => anyhow::bail!(
            "interrupted; {} rows written to {}",
            rows,
            settings.export_path.display()
        ),
    }
}

fn print_summary(summary: &RunSummary, settings: &Settings) {
    if summary.total() == 0 {
        println!(
            "{} No JPEG or PNG images found in {}",
            style("!").yellow(),
            settings.image_root.display()
        );
    } else {
        println!(
            "{} Annotation complete: {} done, {} skipped",
            style("✓").green(),
            summary.done,
            summary.skipped
        );
    }

    println!(
        "  {} Export: {}",
        style("→").dim(),
        settings.export_path.display()
    );

    if let Some(ref path) = settings.database_path {
        println!("  {} Store: {}", style("→").dim(), path.display());
        if summary.store_failures > 0 {
            println!(
                "  {} {} results were not written to the store",
                style("!").yellow(),
                summary.store_failures
            );
        }
    }
}
