//! Configuration file support for the CLI.
//!
//! Loads and saves CLI configuration from TOML files. The engine limits
//! live in an embedded `[engine]` section:
//!
//! ```toml
//! output_format = "json"
//! stop_on_error = true
//!
//! [engine.limits]
//! max_rows = 100
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use scql_common::config::EngineConfig;

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Default output format.
    #[serde(default = "default_format")]
    pub output_format: String,

    /// Echo each command APDU before its response.
    #[serde(default = "default_echo")]
    pub echo: bool,

    /// Stop a script at the first response that is not `9000`.
    #[serde(default)]
    pub stop_on_error: bool,

    /// Image file loaded before and saved after a run.
    #[serde(default)]
    pub image: Option<PathBuf>,

    /// Engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_format() -> String {
    "text".to_string()
}

fn default_echo() -> bool {
    true
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            output_format: default_format(),
            echo: default_echo(),
            stop_on_error: false,
            image: None,
            engine: EngineConfig::default(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Saves configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Loads the default configuration file.
    ///
    /// Looks in `~/.scql/config.toml`, returning the defaults if absent.
    pub fn load_default() -> Result<Self> {
        match Self::default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Returns the default configuration file path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".scql").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.output_format, "text");
        assert!(config.echo);
        assert!(!config.stop_on_error);
        assert_eq!(config.engine.limits.max_tables, 8);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "output_format = \"hex\"\n[engine.limits]\nmax_rows = 40\n")
            .unwrap();

        let config = CliConfig::from_file(&path).unwrap();
        assert_eq!(config.output_format, "hex");
        assert!(config.echo);
        assert_eq!(config.engine.limits.max_rows, 40);
        assert_eq!(config.engine.limits.max_views, 5);
    }

    #[test]
    fn test_invalid_engine_section_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[engine.limits]\nmax_columns = 0\n").unwrap();
        assert!(CliConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let config = CliConfig {
            stop_on_error: true,
            image: Some(PathBuf::from("card.img")),
            ..CliConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(CliConfig::from_file(&path).unwrap(), config);
    }
}
