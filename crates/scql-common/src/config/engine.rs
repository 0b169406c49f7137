//! Engine configuration structures.
//!
//! The defaults are the card profile. Hosts may load a TOML file to run the
//! engine with other limits (e.g. a larger desktop simulator), but every
//! value must still fit the one-byte length encoding.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{
    MAX_COLUMNS, MAX_COLUMN_NAME_LENGTH, MAX_DATA_COLUMN_LENGTH, MAX_LP_LENGTH, MAX_ROWS,
    MAX_TABLES, MAX_VIEWS,
};
use crate::error::{ScqlError, ScqlResult};

/// Main engine configuration.
///
/// # Example
///
/// ```rust
/// use scql_common::config::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.limits.max_rows, 25);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity limits.
    #[serde(default)]
    pub limits: Limits,
}

impl EngineConfig {
    /// Creates a configuration with the given limits.
    #[must_use]
    pub fn with_limits(limits: Limits) -> Self {
        Self { limits }
    }

    /// Parses a configuration from TOML text and validates it.
    pub fn from_toml_str(text: &str) -> ScqlResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ScqlError::InvalidConfig {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a TOML file and validates it.
    pub fn from_file(path: &Path) -> ScqlResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> ScqlResult<String> {
        toml::to_string_pretty(self).map_err(|e| ScqlError::InvalidConfig {
            message: e.to_string(),
        })
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> ScqlResult<()> {
        self.limits.validate()
    }
}

/// Capacity limits enforced by the catalog and the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum number of tables.
    /// Default: 8
    pub max_tables: usize,

    /// Maximum number of views.
    /// Default: 5
    pub max_views: usize,

    /// Maximum number of columns per table.
    /// Default: 10
    pub max_columns: usize,

    /// Maximum column name length in bytes. Table and view names are
    /// bounded only by the one-byte length prefix.
    /// Default: 8
    pub max_column_name_length: usize,

    /// Maximum column value length in bytes.
    /// Default: 15
    pub max_data_column_length: usize,

    /// Maximum rows per table.
    /// Default: 25
    pub max_rows: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_tables: MAX_TABLES,
            max_views: MAX_VIEWS,
            max_columns: MAX_COLUMNS,
            max_column_name_length: MAX_COLUMN_NAME_LENGTH,
            max_data_column_length: MAX_DATA_COLUMN_LENGTH,
            max_rows: MAX_ROWS,
        }
    }
}

impl Limits {
    /// Validates the limits and returns an error if invalid.
    pub fn validate(&self) -> ScqlResult<()> {
        let named = [
            ("max_tables", self.max_tables),
            ("max_views", self.max_views),
            ("max_columns", self.max_columns),
            ("max_column_name_length", self.max_column_name_length),
            ("max_data_column_length", self.max_data_column_length),
            ("max_rows", self.max_rows),
        ];

        for (field, value) in named {
            if value == 0 {
                return Err(ScqlError::InvalidConfig {
                    message: format!("{field} must be at least 1"),
                });
            }
        }

        // Counts and lengths travel as single bytes.
        for (field, value) in &named[2..5] {
            if *value > MAX_LP_LENGTH {
                return Err(ScqlError::InvalidConfig {
                    message: format!("{field} must not exceed {MAX_LP_LENGTH}"),
                });
            }
        }

        if self.max_rows > usize::from(u16::MAX) {
            return Err(ScqlError::InvalidConfig {
                message: format!("max_rows must not exceed {}", u16::MAX),
            });
        }

        Ok(())
    }
}
