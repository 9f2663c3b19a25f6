//! Import configuration.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Minimum supported ONNX IR version
pub const MIN_IR_VERSION: i64 = 3;

/// Settings for one model import.
///
/// Can be read from TOML:
///
/// ```toml
/// min_ir_version = 4
/// fold_transposes = false
/// max_arena_bytes = 1073741824
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Oldest IR version accepted
    pub min_ir_version: i64,
    /// Fold `Transpose` nodes whose input is an initializer
    pub fold_transposes: bool,
    /// Byte budget for the import arena
    pub max_arena_bytes: Option<usize>,
    /// Allow initializers stored in external files
    pub allow_external_data: bool,
    /// Directory external data paths are resolved against
    pub base_dir: Option<PathBuf>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            min_ir_version: MIN_IR_VERSION,
            fold_transposes: true,
            max_arena_bytes: None,
            allow_external_data: true,
            base_dir: None,
        }
    }
}

impl ImportConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read a configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Set the oldest accepted IR version.
    #[must_use]
    pub fn with_min_ir_version(mut self, version: i64) -> Self {
        self.min_ir_version = version;
        self
    }

    /// Enable or disable transpose folding.
    #[must_use]
    pub fn with_fold_transposes(mut self, enable: bool) -> Self {
        self.fold_transposes = enable;
        self
    }

    /// Cap the bytes the import may allocate.
    #[must_use]
    pub fn with_max_arena_bytes(mut self, bytes: usize) -> Self {
        self.max_arena_bytes = Some(bytes);
        self
    }

    /// Enable or disable external data.
    #[must_use]
    pub fn with_external_data(mut self, enable: bool) -> Self {
        self.allow_external_data = enable;
        self
    }

    /// Set the directory for external data.
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ImportConfig::default();
        assert_eq!(config.min_ir_version, MIN_IR_VERSION);
        assert!(config.fold_transposes);
        assert!(config.allow_external_data);
        assert_eq!(config.max_arena_bytes, None);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ImportConfig::from_toml_str("fold_transposes = false\nmax_arena_bytes = 4096\n")
            .unwrap();
        assert!(!config.fold_transposes);
        assert_eq!(config.max_arena_bytes, Some(4096));
        assert_eq!(config.min_ir_version, MIN_IR_VERSION);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(ImportConfig::from_toml_str("fold_transposes = \"maybe\"").is_err());
    }

    #[test]
    fn test_builder() {
        let config = ImportConfig::new()
            .with_min_ir_version(6)
            .with_external_data(false)
            .with_base_dir("/models");
        assert_eq!(config.min_ir_version, 6);
        assert!(!config.allow_external_data);
        assert_eq!(config.base_dir, Some(PathBuf::from("/models")));
    }
}
