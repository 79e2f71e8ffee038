//! Error types for the audioconv library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SessionError`] — **Terminal for the session**: validation rejected the
//!   file, the upload failed, a status tick failed, or the server reported
//!   that the task failed or vanished. The session moves to its Error phase
//!   and shows exactly one message; only a user reset leaves that phase.
//!
//! * [`ClientError`] — **API-level**: the caller misused the controller
//!   (submitted while busy), the session was cancelled under a waiter, the
//!   input path could not be read, or an output file could not be written.
//!   A session failure is wrapped as [`ClientError::Session`] when it has to
//!   travel through a `Result<_, ClientError>`.
//!
//! Every session failure is surfaced the same way. No distinction is made
//! between transient and permanent failures and nothing is retried
//! automatically.

use crate::report::format_file_size;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Reasons a candidate file is rejected before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    /// No file was selected (empty drop, cancelled picker).
    #[error("Please select a file.")]
    NoFile,

    /// Neither the media type nor the extension is MP3/WAV.
    #[error("Only MP3 or WAV files are allowed.")]
    UnsupportedType,

    /// File is larger than the configured limit.
    #[error("File size exceeds {} limit.", limit_label(.limit))]
    TooLarge { size: u64, limit: u64 },

    /// File has zero bytes.
    #[error("The file is empty.")]
    Empty,
}

/// `100MB` for whole mebibytes, otherwise the formatted size (`1.5 MB`, `512 KB`).
fn limit_label(limit: &u64) -> String {
    const MIB: u64 = 1024 * 1024;
    let limit = *limit;
    if limit >= MIB && limit % MIB == 0 {
        format!("{}MB", limit / MIB)
    } else {
        format_file_size(limit)
    }
}

/// Coarse classification of a [`SessionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Upload,
    PollTransport,
    ServerReported,
}

/// A failure that ends the current conversion session.
///
/// The `Display` output is the exact message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SessionError {
    /// Client-side validation rejected the file.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The upload request failed or returned a malformed success body.
    #[error("Upload failed: {message}")]
    Upload { message: String },

    /// A status request failed at the transport or HTTP level.
    #[error("Error checking status: {message}")]
    PollTransport { message: String },

    /// The server does not know the task id (`status = unknown`).
    #[error("Conversion task not found")]
    TaskNotFound,

    /// The server reported `status = error`.
    #[error("Conversion failed: {message}")]
    ConversionFailed { message: String },
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Validation(_) => ErrorKind::Validation,
            SessionError::Upload { .. } => ErrorKind::Upload,
            SessionError::PollTransport { .. } => ErrorKind::PollTransport,
            SessionError::TaskNotFound | SessionError::ConversionFailed { .. } => {
                ErrorKind::ServerReported
            }
        }
    }

    pub(crate) fn upload(message: impl Into<String>) -> Self {
        SessionError::Upload {
            message: message.into(),
        }
    }

    pub(crate) fn poll(message: impl Into<String>) -> Self {
        SessionError::PollTransport {
            message: message.into(),
        }
    }
}

/// All API-level errors returned by the audioconv library.
#[derive(Debug, Error)]
pub enum ClientError {
    // ── Session errors ────────────────────────────────────────────────────
    /// The session ended in its Error phase.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A file was submitted while another one is still being processed.
    #[error("A conversion is already in progress ({phase}); cancel or reset it first")]
    Busy { phase: String },

    /// The session was reset or cancelled before it reached a terminal phase.
    #[error("Conversion cancelled")]
    Cancelled,

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Audio file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Input file exists but could not be read.
    #[error("Failed to read '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Download errors ───────────────────────────────────────────────────
    /// Fetching the converted file failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// The session failure behind this error, if any.
    pub fn as_session(&self) -> Option<&SessionError> {
        match self {
            ClientError::Session(e) => Some(e),
            _ => None,
        }
    }
}
