/// Errors reported by a container backend
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from the ZIP container library
    #[error("ZIP error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    /// Error serializing/deserializing the manifest
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// No node exists at the given path
    #[error("No such link: {0}")]
    NotFound(String),

    /// A node already exists at the given path
    #[error("Link already exists: {0}")]
    AlreadyExists(String),

    /// A path component refers to a dataset where a group is required
    #[error("Not a group: {0}")]
    NotAGroup(String),

    /// The node at the given path is a group where a dataset is required
    #[error("Not a dataset: {0}")]
    NotADataset(String),

    /// Axis 0 of the dataset was declared with a fixed maximum extent
    #[error("Dataset {path} is not extendible (maximum extent {max})")]
    NotExtendible {
        /// Dataset path
        path: String,
        /// Declared maximum extent
        max: u64,
    },

    /// Element index outside the current extent
    #[error("Element {index} out of bounds for {path} with {len} elements")]
    OutOfBounds {
        /// Dataset path
        path: String,
        /// Requested element index
        index: u64,
        /// Current element count
        len: u64,
    },

    /// Element byte length does not match a fixed-size layout
    #[error("Element for {path} must be {expected} bytes, got {actual}")]
    ElementSize {
        /// Dataset path
        path: String,
        /// Layout size
        expected: usize,
        /// Size supplied
        actual: usize,
    },

    /// The element slot exists but was never written
    #[error("Element {index} of {path} has not been written")]
    Unwritten {
        /// Dataset path
        path: String,
        /// Element index
        index: u64,
    },

    /// Malformed path or dataspace
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The file is not a valid container
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

impl BackendError {
    /// True for failures of the storage medium itself, as opposed to
    /// structural answers about the hierarchy.
    pub fn is_io(&self) -> bool {
        matches!(self, BackendError::IoError(_) | BackendError::ZipError(_))
    }
}

/// Result alias used by the backend layer
pub type BackendResult<T> = Result<T, BackendError>;
