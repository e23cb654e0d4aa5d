//! Service layer. Business logic separated from UI concerns.

pub mod annotate;

pub use annotate::{
    AnnotationEvent, AnnotationService, ItemError, ItemOutcome, ProcessingStage, ResultSinks,
    RunSummary,
};
