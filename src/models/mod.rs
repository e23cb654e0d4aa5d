//! Data models for imgscribe.

mod annotation;
mod image;

pub use annotation::{AnnotationResult, ImageAnnotation, NO_DESCRIPTION, TAG_SEPARATOR};
pub use image::{ImageFormat, ImageReference};
