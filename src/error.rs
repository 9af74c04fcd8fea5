//! Error types for uwatch2
//!
//! Provides a unified error type for all operations.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using WatchError
pub type Result<T> = std::result::Result<T, WatchError>;

/// Unified error type for uwatch2 operations
#[derive(Debug, Error)]
pub enum WatchError {
    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    /// Wrong arity, type or range for a command's argument or response layout
    #[error("Argument error: {0}")]
    Argument(String),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// Malformed header, unexpected fragment, overrun, unknown handle, key mismatch
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Timed out after {waited:?} waiting for response to command 0x{command_key:02x}")]
    Timeout { command_key: u8, waited: Duration },

    #[error("Disconnected while waiting for response to command 0x{0:02x}")]
    Disconnected(u8),

    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("Connect error: {0}")]
    Connect(String),

    #[error("Write error: {0}")]
    Write(String),

    #[error("Subscribe error: {0}")]
    Subscribe(String),

    #[error("Scan error: {0}")]
    Scan(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl WatchError {
    /// True for errors caused by the device or link rather than by the caller
    pub fn is_protocol(&self) -> bool {
        matches!(self, WatchError::Protocol(_))
    }
}
