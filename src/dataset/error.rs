use std::path::PathBuf;

use crate::container::BackendError;
use crate::path::PathError;
use crate::records::CodecError;

/// Errors that can occur during dataset operations
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// Allocation failure while copying data out of the container
    #[error("Memory error: {0}")]
    MemoryError(String),

    /// Opening, creating or validating the container file failed
    #[error("File error for {path}: {reason}")]
    FileError {
        /// Container file path
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Creating, writing or deleting structure inside the container failed
    #[error("Storage error at {path}: {source}")]
    StorageError {
        /// Path inside the container
        path: String,
        /// Backend failure
        #[source]
        source: BackendError,
    },

    /// The requested variable does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Read past the end of a series
    #[error("Index {index} out of range for {path} with {count} records")]
    IndexOutOfRange {
        /// Series path
        path: String,
        /// Requested index
        index: u64,
        /// Current record count
        count: u64,
    },

    /// Record layout differs from the layout the series was created with
    #[error("Type mismatch for {path}: series stores {stored}, record is {found}")]
    TypeMismatch {
        /// Series path
        path: String,
        /// Layout name stored in the container
        stored: String,
        /// Layout name of the offered record
        found: String,
    },

    /// Invalid root group or variable name
    #[error("Invalid name: {0}")]
    InvalidName(#[from] PathError),

    /// Record bytes could not be encoded or decoded
    #[error("Codec error: {0}")]
    CodecError(#[from] CodecError),

    /// The dataset has no open container file
    #[error("Dataset is not open")]
    NotOpen,

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DatasetError {
    /// Wrap a backend failure at `path` as a storage error
    pub(crate) fn storage(path: &str, source: BackendError) -> Self {
        DatasetError::StorageError {
            path: path.to_string(),
            source,
        }
    }

    /// Build a file error from anything displayable
    pub(crate) fn file(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        DatasetError::FileError {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
