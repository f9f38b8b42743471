//! Error types for the flacpack workspace.
//!
//! Every fallible operation in the core and codec crates surfaces one of
//! these kinds; nothing is retried internally and nothing is silently
//! recovered.

use thiserror::Error;

/// Main error type for the flacpack workspace.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying byte source exhausted in the middle of a read.
    #[error("End of stream")]
    EndOfStream,

    /// A FLAC format rule was violated (bad sync, reserved code, CRC
    /// mismatch, out-of-range field, misordered seek points, ...).
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A serializer was invoked while its value's invariants do not hold,
    /// or an operation was attempted on a closed reader/writer.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The caller violated a precondition (bit count out of range, bad
    /// sample depth, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A byte-boundary-required operation was called mid-byte.
    #[error("Not at a byte boundary")]
    NotAligned,

    /// Seek or length was requested on a source that cannot provide it.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// I/O error from a file-backed source or sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid data error.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Error::InvalidData(msg.into())
    }

    /// Create an invalid state error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Error::InvalidState(msg.into())
    }

    /// Create an invalid argument error.
    pub fn invalid_arg(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Create an unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    /// Check if this is an end-of-stream error.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, Error::EndOfStream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_data("sync code expected");
        assert_eq!(err.to_string(), "Invalid data: sync code expected");
    }

    #[test]
    fn test_is_eof() {
        assert!(Error::EndOfStream.is_eof());
        assert!(!Error::NotAligned.is_eof());
    }
}
