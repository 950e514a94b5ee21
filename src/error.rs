//! Centralized error types for mailnorm.
//!
//! Only boundary problems surface here. Anything wrong *inside* a message
//! (bad base64, unknown charsets, broken encoded words, unparseable dates)
//! degrades to a best-effort value instead.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailnorm library.
#[derive(Error, Debug)]
pub enum NormalizeError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The input could not be read as a message envelope at all.
    #[error("Invalid message envelope: {0}")]
    InvalidEnvelope(String),

    /// A field the envelope needs to identify or decode the message is absent.
    #[error("Message envelope is missing required field '{0}'")]
    MissingField(&'static str),

    /// The attachment source has no bytes for the requested attachment.
    #[error("Attachment '{attachment_id}' not found for message '{message_id}'")]
    AttachmentNotFound {
        message_id: String,
        attachment_id: String,
    },

    /// The session handle expired and must be refreshed by its owner.
    #[error("Session expired; refresh it before fetching")]
    SessionExpired,

    /// A message or attachment source failed for its own reasons.
    #[error("Message source error: {0}")]
    Source(String),
}

/// Convenience alias for `Result<T, NormalizeError>`.
pub type Result<T> = std::result::Result<T, NormalizeError>;

impl NormalizeError {
    /// Create an `Io` variant from a path and an `io::Error`.
    ///
    /// `NotFound` is mapped to [`NormalizeError::FileNotFound`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::FileNotFound(path);
        }
        Self::Io { path, source }
    }
}

impl From<serde_json::Error> for NormalizeError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidEnvelope(e.to_string())
    }
}
