//! Image annotation service.
//!
//! Drives discovered images one at a time through encode, request, parse and
//! persist. A failing image is skipped and never affects the next one.
//! Separated from UI concerns - emits events for progress tracking.

use std::fmt;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::export::{CsvExporter, ExportError};
use crate::llm::{AnnotationError, Annotator, EncodedImage};
use crate::models::{AnnotationResult, ImageReference};
use crate::repository::{MetadataStore, RepositoryError};

/// Stage an image was in when it was abandoned.
///
/// Images move through these in order; one that passes `Persisting` is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingStage {
    Encoding,
    Requesting,
    Parsing,
    Persisting,
}

impl ProcessingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Encoding => "encoding",
            Self::Requesting => "requesting",
            Self::Parsing => "parsing",
            Self::Persisting => "persisting",
        }
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an image was skipped.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    #[error("export failed: {0}")]
    Export(#[from] ExportError),
}

impl ItemError {
    /// The stage the image was in when it failed.
    pub fn stage(&self) -> ProcessingStage {
        match self {
            ItemError::Annotation(AnnotationError::Read { .. }) => ProcessingStage::Encoding,
            ItemError::Annotation(AnnotationError::Transport(_))
            | ItemError::Annotation(AnnotationError::Api { .. }) => ProcessingStage::Requesting,
            ItemError::Annotation(AnnotationError::Decode(_)) => ProcessingStage::Parsing,
            ItemError::Export(_) => ProcessingStage::Persisting,
        }
    }
}

/// Final state of one image.
#[derive(Debug)]
pub enum ItemOutcome {
    /// Written to the export file. `store_error` is set if the keyed store
    /// rejected the write.
    Done {
        result: AnnotationResult,
        store_error: Option<RepositoryError>,
    },
    /// Abandoned for this run.
    Skipped { error: ItemError },
}

/// Events emitted during annotation processing.
#[derive(Debug, Clone)]
pub enum AnnotationEvent {
    /// Image picked up from the scan
    ImageStarted { file_path: String },
    /// Image annotated and exported
    ImageCompleted { file_path: String },
    /// Image abandoned
    ImageSkipped {
        file_path: String,
        stage: ProcessingStage,
        error: String,
    },
    /// Keyed store write failed; the export row stands
    StoreFailed { file_path: String, error: String },
    /// Run complete
    Complete(RunSummary),
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub done: usize,
    pub skipped: usize,
    pub store_failures: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.done + self.skipped
    }
}

/// Destinations for results of one run.
pub struct ResultSinks<'a> {
    pub export: &'a mut CsvExporter,
    pub store: Option<&'a dyn MetadataStore>,
}

/// Service for annotating images.
pub struct AnnotationService<A> {
    annotator: A,
}

impl<A: Annotator> AnnotationService<A> {
    /// Create a new annotation service.
    pub fn new(annotator: A) -> Self {
        Self { annotator }
    }

    pub fn annotator(&self) -> &A {
        &self.annotator
    }

    /// Encode, request and parse one image.
    async fn annotate_image(&self, image: &ImageReference) -> Result<AnnotationResult, ItemError> {
        let encoded = EncodedImage::read(image)?;
        let annotation = self.annotator.annotate(&encoded).await?;
        Ok(AnnotationResult::new(image, annotation))
    }

    /// Take one image through every stage and into both sinks.
    pub async fn process_image(
        &self,
        image: &ImageReference,
        sinks: &mut ResultSinks<'_>,
    ) -> ItemOutcome {
        let result = match self.annotate_image(image).await {
            Ok(result) => result,
            Err(error) => return ItemOutcome::Skipped { error },
        };

        if let Err(e) = sinks.export.append(&result) {
            return ItemOutcome::Skipped { error: e.into() };
        }

        let store_error = sinks.store.and_then(|store| store.upsert(&result).err());
        if let Some(ref e) = store_error {
            info!("Failed to store {}: {}", result.file_path, e);
        }

        ItemOutcome::Done {
            result,
            store_error,
        }
    }

    /// Annotate every image, strictly in order.
    pub async fn annotate_all<I>(
        &self,
        images: I,
        sinks: &mut ResultSinks<'_>,
        event_tx: &mpsc::UnboundedSender<AnnotationEvent>,
    ) -> RunSummary
    where
        I: IntoIterator<Item = ImageReference>,
    {
        let mut summary = RunSummary::default();

        for image in images {
            let file_path = image.file_path();
            debug!("Annotating {}", file_path);
            let _ = event_tx.send(AnnotationEvent::ImageStarted {
                file_path: file_path.clone(),
            });

            match self.process_image(&image, sinks).await {
                ItemOutcome::Done { store_error, .. } => {
                    summary.done += 1;
                    if let Some(e) = store_error {
                        summary.store_failures += 1;
                        let _ = event_tx.send(AnnotationEvent::StoreFailed {
                            file_path: file_path.clone(),
                            error: e.to_string(),
                        });
                    }
                    let _ = event_tx.send(AnnotationEvent::ImageCompleted { file_path });
                }
                ItemOutcome::Skipped { error } => {
                    let stage = error.stage();
                    info!("Skipping {} ({}): {}", file_path, stage, error);
                    summary.skipped += 1;
                    let _ = event_tx.send(AnnotationEvent::ImageSkipped {
                        file_path,
                        stage,
                        error: error.to_string(),
                    });
                }
            }
        }

        info!(
            "Annotation finished: {} done, {} skipped, {} store failures",
            summary.done, summary.skipped, summary.store_failures
        );
        let _ = event_tx.send(AnnotationEvent::Complete(summary));

        summary
    }
}
