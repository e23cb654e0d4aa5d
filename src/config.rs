//! Configuration management for imgscribe.
//!
//! Values come from, lowest priority first: built-in defaults, the config
//! file, environment variables, command-line flags. Everything is resolved
//! once into [`Settings`] and passed down by reference.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::LlmConfig;

/// Config file picked up from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILENAME: &str = "imgscribe.toml";

/// Default keyed-store database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "metadata.db";

/// Default export filename.
pub const DEFAULT_EXPORT_FILENAME: &str = "image_metadata.csv";

/// Configuration errors. All of them stop the run before any work starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("no image folder given (pass ROOT, set IMAGE_FOLDER_PATH, or set input.root)")]
    MissingImageRoot,

    #[error("OPENAI_API_KEY is not set (required for {0})")]
    MissingApiKey(String),
}

/// Input section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    /// Folder scanned for images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

/// Export section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// CSV file recreated on every run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Keyed store section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Write results to the keyed store as well as the export file.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// SQLite database file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

/// File-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    /// File this config was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load the explicit config file, or `imgscribe.toml` from the working
    /// directory if present, or defaults. Environment overrides for the
    /// LLM connection are applied in every case.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load_from_path(path)?,
            None => {
                let candidate = Path::new(DEFAULT_CONFIG_FILENAME);
                if candidate.is_file() {
                    tracing::debug!("Using config file {}", candidate.display());
                    Self::load_from_path(candidate)?
                } else {
                    Self::default()
                }
            }
        };
        config.llm.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific file path.
    /// Supports TOML, YAML and JSON based on file extension.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
        let parse_err = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };

        let mut config: Config = match ext {
            "json" => serde_json::from_str(&contents).map_err(|e| parse_err(e.to_string()))?,
            "yaml" | "yml" => {
                serde_yaml::from_str(&contents).map_err(|e| parse_err(e.to_string()))?
            }
            _ => toml::from_str(&contents).map_err(|e| parse_err(e.to_string()))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory that relative paths in the config file are resolved from.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent())
            .map(Path::to_path_buf)
    }

    /// Resolve a path taken from this config file.
    fn resolve_file_path(&self, raw: &str) -> PathBuf {
        resolve_path(raw, self.base_dir().as_deref())
    }

    /// Keyed-store path: explicit override, then config, then the default.
    pub fn database_path(&self, explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(path) => expand_path(path),
            None => self
                .store
                .path
                .as_deref()
                .map(|p| self.resolve_file_path(p))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_FILENAME)),
        }
    }
}

/// Command-line (and environment) overrides for a run.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub root: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub no_db: bool,
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

/// Everything one annotation run needs, fully resolved.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Folder scanned for images.
    pub image_root: PathBuf,
    /// CSV export target.
    pub export_path: PathBuf,
    /// Keyed store, if enabled.
    pub database_path: Option<PathBuf>,
    /// Vision client settings.
    pub llm: LlmConfig,
}

impl Settings {
    /// Merge config file values with run overrides.
    pub fn resolve(config: &Config, overrides: &RunOverrides) -> Result<Self, ConfigError> {
        let image_root = match (&overrides.root, &config.input.root) {
            (Some(root), _) => expand_path(root),
            (None, Some(root)) => config.resolve_file_path(root),
            (None, None) => return Err(ConfigError::MissingImageRoot),
        };

        let export_path = match (&overrides.output, &config.export.path) {
            (Some(path), _) => expand_path(path),
            (None, Some(path)) => config.resolve_file_path(path),
            (None, None) => PathBuf::from(DEFAULT_EXPORT_FILENAME),
        };

        let database_path = if overrides.no_db || !config.store.enabled {
            None
        } else {
            Some(config.database_path(overrides.database.as_deref()))
        };

        let mut llm = config.llm.clone();
        if let Some(ref endpoint) = overrides.endpoint {
            llm = llm.with_endpoint(endpoint);
        }
        if let Some(ref model) = overrides.model {
            llm = llm.with_model(model);
        }
        if llm.api_key.is_none() && llm.requires_api_key() {
            return Err(ConfigError::MissingApiKey(llm.endpoint.clone()));
        }

        Ok(Self {
            image_root,
            export_path,
            database_path,
            llm,
        })
    }
}

/// Expand `~` and resolve relative paths against `base` (if given).
pub fn resolve_path(raw: &str, base: Option<&Path>) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(raw).as_ref());
    match base {
        Some(base) if expanded.is_relative() => base.join(expanded),
        _ => expanded,
    }
}

fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(raw) => resolve_path(raw, None),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn with_key(mut config: Config) -> Config {
        config.llm.api_key = Some("sk-test".to_string());
        config
    }

    #[test]
    fn test_load_toml_resolves_relative_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("imgscribe.toml");
        std::fs::write(
            &path,
            r#"
[input]
root = "photos"

[export]
path = "out/metadata.csv"

[store]
path = "/var/lib/imgscribe/metadata.db"

[llm]
model = "gpt-4o-mini"
max_tokens = 500
"#,
        )
        .unwrap();

        let config = with_key(Config::load_from_path(&path).unwrap());
        let settings = Settings::resolve(&config, &RunOverrides::default()).unwrap();

        assert_eq!(settings.image_root, dir.path().join("photos"));
        assert_eq!(settings.export_path, dir.path().join("out/metadata.csv"));
        assert_eq!(
            settings.database_path,
            Some(PathBuf::from("/var/lib/imgscribe/metadata.db"))
        );
        assert_eq!(settings.llm.model, "gpt-4o-mini");
        assert_eq!(settings.llm.max_tokens, 500);
    }

    #[test]
    fn test_load_json_and_yaml() {
        let dir = tempdir().unwrap();

        let json = dir.path().join("config.json");
        std::fs::write(&json, r#"{"store": {"enabled": false}}"#).unwrap();
        assert!(!Config::load_from_path(&json).unwrap().store.enabled);

        let yaml = dir.path().join("config.yaml");
        std::fs::write(&yaml, "llm:\n  model: llava\n").unwrap();
        assert_eq!(Config::load_from_path(&yaml).unwrap().llm.model, "llava");
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[input\nroot = ").unwrap();
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_overrides_win() {
        let mut config = with_key(Config::default());
        config.input.root = Some("/from/config".to_string());

        let overrides = RunOverrides {
            root: Some(PathBuf::from("/from/cli")),
            output: Some(PathBuf::from("/tmp/out.csv")),
            database: Some(PathBuf::from("/tmp/meta.db")),
            model: Some("llava:13b".to_string()),
            endpoint: Some("http://localhost:11434/v1".to_string()),
            ..Default::default()
        };
        let settings = Settings::resolve(&config, &overrides).unwrap();

        assert_eq!(settings.image_root, PathBuf::from("/from/cli"));
        assert_eq!(settings.export_path, PathBuf::from("/tmp/out.csv"));
        assert_eq!(settings.database_path, Some(PathBuf::from("/tmp/meta.db")));
        assert_eq!(settings.llm.model, "llava:13b");
        assert_eq!(settings.llm.endpoint, "http://localhost:11434/v1");
    }

    #[test]
    fn test_store_toggle() {
        let mut config = with_key(Config::default());
        config.input.root = Some("/photos".to_string());

        let settings = Settings::resolve(&config, &RunOverrides::default()).unwrap();
        assert_eq!(
            settings.database_path,
            Some(PathBuf::from(DEFAULT_DATABASE_FILENAME))
        );
        assert_eq!(settings.export_path, PathBuf::from(DEFAULT_EXPORT_FILENAME));

        let no_db = RunOverrides {
            no_db: true,
            ..Default::default()
        };
        assert!(Settings::resolve(&config, &no_db)
            .unwrap()
            .database_path
            .is_none());

        config.store.enabled = false;
        assert!(Settings::resolve(&config, &RunOverrides::default())
            .unwrap()
            .database_path
            .is_none());
    }

    #[test]
    fn test_missing_root() {
        let config = with_key(Config::default());
        assert!(matches!(
            Settings::resolve(&config, &RunOverrides::default()),
            Err(ConfigError::MissingImageRoot)
        ));
    }

    #[test]
    fn test_api_key_required_only_for_hosted_endpoint() {
        let mut config = Config::default();
        config.input.root = Some("/photos".to_string());
        config.llm.api_key = None;

        assert!(matches!(
            Settings::resolve(&config, &RunOverrides::default()),
            Err(ConfigError::MissingApiKey(_))
        ));

        let local = RunOverrides {
            endpoint: Some("http://127.0.0.1:8080/v1".to_string()),
            ..Default::default()
        };
        assert!(Settings::resolve(&config, &local).is_ok());
    }

    #[test]
    fn test_resolve_path() {
        let base = Path::new("/etc/imgscribe");
        assert_eq!(
            resolve_path("data/meta.db", Some(base)),
            PathBuf::from("/etc/imgscribe/data/meta.db")
        );
        assert_eq!(
            resolve_path("/abs/meta.db", Some(base)),
            PathBuf::from("/abs/meta.db")
        );
        assert_eq!(resolve_path("rel.csv", None), PathBuf::from("rel.csv"));
        assert!(!resolve_path("~/photos", None).starts_with("~"));
    }
}
