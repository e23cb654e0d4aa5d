//! Annotation models: what the inference service returns and what the sinks store.

use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Deserializer, Serialize};

use super::ImageReference;

/// Stored when the service does not supply a description.
pub const NO_DESCRIPTION: &str = "no description available";

/// Separator used when flattening tags into a single column.
pub const TAG_SEPARATOR: &str = ", ";

/// Structured annotation decoded from the model's JSON reply.
///
/// Missing, null or blank fields fall back to defaults: the description
/// becomes [`NO_DESCRIPTION`] and the tags an empty list. Wrong types
/// (e.g. a number where a string is expected) are decode errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAnnotation {
    #[serde(default = "default_description", deserialize_with = "description_or_default")]
    pub description: String,
    #[serde(default, deserialize_with = "tags_or_default")]
    pub tags: Vec<String>,
}

fn default_description() -> String {
    NO_DESCRIPTION.to_string()
}

fn description_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(default_description))
}

fn tags_or_default<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Vec<String>>::deserialize(deserializer)?;
    Ok(value
        .unwrap_or_default()
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}

impl Default for ImageAnnotation {
    fn default() -> Self {
        Self {
            description: default_description(),
            tags: Vec::new(),
        }
    }
}

/// Normalized outcome of one successfully annotated image.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationResult {
    /// Natural key in both sinks.
    pub file_path: String,
    pub description: String,
    pub tags: Vec<String>,
    /// Local time at which processing completed.
    pub analyzed_at: DateTime<Local>,
}

impl AnnotationResult {
    /// Stamp an annotation for `image` with the current time.
    pub fn new(image: &ImageReference, annotation: ImageAnnotation) -> Self {
        Self::with_timestamp(image.file_path(), annotation, Local::now())
    }

    pub fn with_timestamp(
        file_path: impl Into<String>,
        annotation: ImageAnnotation,
        analyzed_at: DateTime<Local>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            description: annotation.description,
            tags: annotation.tags,
            analyzed_at,
        }
    }

    /// Tags in the flattened form both sinks persist.
    pub fn tags_joined(&self) -> String {
        self.tags.join(TAG_SEPARATOR)
    }

    /// ISO-8601 timestamp as persisted by both sinks.
    pub fn analyzed_at_iso(&self) -> String {
        self.analyzed_at.to_rfc3339_opts(SecondsFormat::Micros, false)
    }
}
