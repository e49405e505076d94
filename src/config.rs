//! Dataset configuration.
//!
//! Defaults suit most uses; a TOML file can override them:
//!
//! ```toml
//! # ismrmrd.toml
//! [storage]
//! compression = "deflate"
//! sync = "every-write"
//! create_parent_dirs = true
//! ```

use std::path::Path;

use serde::Deserialize;
use zip::CompressionMethod;

use crate::dataset::DatasetError;

/// Compression applied to manifest and payload entries.
///
/// The mimetype entry is always stored uncompressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryCompression {
    /// No compression (fastest open and flush)
    Stored,
    /// Deflate compression
    #[default]
    Deflate,
}

impl EntryCompression {
    /// The matching ZIP compression method
    pub fn method(&self) -> CompressionMethod {
        match self {
            EntryCompression::Stored => CompressionMethod::Stored,
            EntryCompression::Deflate => CompressionMethod::Deflated,
        }
    }
}

/// When pending changes are persisted to disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncPolicy {
    /// Persist on `flush` and `close` only
    #[default]
    OnClose,
    /// Persist after every header write and append
    EveryWrite,
}

/// Storage settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Compression for manifest and payload entries
    pub compression: EntryCompression,

    /// Persistence policy
    pub sync: SyncPolicy,

    /// Create missing parent directories when creating a container
    pub create_parent_dirs: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            compression: EntryCompression::Deflate,
            sync: SyncPolicy::OnClose,
            create_parent_dirs: true,
        }
    }
}

/// Root configuration structure for dataset TOML files.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetConfig {
    /// Storage settings
    #[serde(default)]
    pub storage: StorageConfig,
}

impl DatasetConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, DatasetError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DatasetError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, DatasetError> {
        toml::from_str(content).map_err(|e| {
            DatasetError::ConfigError(format!("Failed to parse TOML configuration: {}", e))
        })
    }

    /// Configuration that persists after every mutation
    pub fn durable() -> Self {
        Self {
            storage: StorageConfig {
                sync: SyncPolicy::EveryWrite,
                ..StorageConfig::default()
            },
        }
    }
}
