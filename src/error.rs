//! Error types for TideKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using TideError
pub type Result<T> = std::result::Result<T, TideError>;

/// Unified error type for TideKV operations
#[derive(Debug, Error)]
pub enum TideError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// The byte stream is not valid RESP. The stream cannot be resynchronized.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A well-formed value that is not a usable request (non-array, empty, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // -------------------------------------------------------------------------
    // AOF Errors
    // -------------------------------------------------------------------------
    #[error("AOF corruption detected at offset {offset}: {reason}")]
    AofCorruption { offset: u64, reason: String },

    #[error("AOF write failed: {0}")]
    AofWrite(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TideError {
    /// True when the error only means the peer went away.
    pub fn is_disconnect(&self) -> bool {
        match self {
            TideError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}
