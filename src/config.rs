//! Configuration for the schema migration
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (layout-compat.toml)
//! - Environment variables (LAYOUT_COMPAT__*)
//!
//! ## Example config file (layout-compat.toml):
//! ```toml
//! [transform]
//! root_id = "_jl"
//!
//! [templates]
//! min_path_segments = 2
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::layout::DEFAULT_ROOT_ID;
use crate::template::DEFAULT_MIN_PATH_SEGMENTS;

/// Main configuration for the migration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompatConfig {
    /// Transform settings
    #[serde(default)]
    pub transform: TransformConfig,

    /// Template detection settings
    #[serde(default)]
    pub templates: TemplateConfig,
}

/// Transform configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// `$id` stamped on output roots that declare none
    #[serde(default = "default_root_id")]
    pub root_id: String,
}

/// Template detection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Dot-separated segments a `{...}` placeholder needs before it is promoted
    /// to `${...}` interpolation. Shorter placeholders stay literal.
    #[serde(default = "default_min_path_segments")]
    pub min_path_segments: usize,
}

fn default_root_id() -> String {
    DEFAULT_ROOT_ID.to_string()
}

fn default_min_path_segments() -> usize {
    DEFAULT_MIN_PATH_SEGMENTS
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            root_id: default_root_id(),
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            min_path_segments: default_min_path_segments(),
        }
    }
}

/// Project-local file names, in increasing precedence
const PROJECT_FILES: &[&str] = &[
    "layout-compat.toml",
    ".layout-compat.toml",
    "config/layout-compat.toml",
];

/// Per-user file under the platform config directory, when one exists
fn user_config_file() -> Option<PathBuf> {
    let dirs = directories::ProjectDirs::from("dev", "familiar", "layout-compat")?;
    let file = dirs.config_dir().join("layout-compat.toml");
    file.exists().then_some(file)
}

impl CompatConfig {
    /// Load configuration from the default locations and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering `config_path` (which must exist) over the
    /// default locations. `LAYOUT_COMPAT__*` variables override every file.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        for name in PROJECT_FILES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
        if let Some(file) = user_config_file() {
            debug!(path = %file.display(), "using user configuration");
            builder = builder.add_source(File::from(file).required(false));
        }
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("LAYOUT_COMPAT")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.check()?;
        Ok(config)
    }

    /// Reject settings the transform cannot run with
    fn check(&self) -> Result<(), ConfigError> {
        if self.transform.root_id.trim().is_empty() {
            return Err(ConfigError::Message(
                "transform.root_id must not be empty".to_string(),
            ));
        }
        if self.templates.min_path_segments == 0 {
            return Err(ConfigError::Message(
                "templates.min_path_segments must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompatConfig::default();
        assert_eq!(config.transform.root_id, "_jl");
        assert_eq!(config.templates.min_path_segments, 2);
    }

    #[test]
    fn test_serialize_config() {
        let config = CompatConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[transform]"));
        assert!(toml_str.contains("[templates]"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");

        let mut config = CompatConfig::default();
        config.transform.root_id = "legacy".to_string();
        config.templates.min_path_segments = 3;
        config.save(&path).unwrap();

        let loaded = CompatConfig::load_from(Some(path.as_path())).unwrap();
        assert_eq!(loaded.transform.root_id, "legacy");
        assert_eq!(loaded.templates.min_path_segments, 3);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(CompatConfig::load_from(Some(path.as_path())).is_err());
    }

    #[test]
    fn test_unusable_settings_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[templates]\nmin_path_segments = 0\n").unwrap();

        let err = CompatConfig::load_from(Some(path.as_path())).unwrap_err();
        assert!(err.to_string().contains("min_path_segments"));
    }
}
