/// Errors that can occur while encoding or decoding records
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// I/O error from the underlying buffer
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Input ended before the record was complete
    #[error("Truncated record: {0}")]
    Truncated(String),

    /// Input continued after the record was complete
    #[error("{0} trailing bytes after record")]
    TrailingBytes(usize),

    /// A buffer length disagrees with the header describing it
    #[error("Size mismatch for {field}: expected {expected}, found {actual}")]
    SizeMismatch {
        /// Field name
        field: &'static str,
        /// Length implied by the header
        expected: usize,
        /// Length present
        actual: usize,
    },

    /// A header field holds a value that cannot be represented
    #[error("Invalid value for {field}: {value}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// Offending value
        value: String,
    },

    /// Text field is not valid UTF-8
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}
