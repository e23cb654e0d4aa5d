//! LLM integration: the vision client used to annotate images.

pub mod client;

pub use client::{
    decode_annotation, AnnotationError, Annotator, EncodedImage, LlmConfig, VisionClient,
};
