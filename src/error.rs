//! Error types for neti
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using NetError
pub type Result<T> = std::result::Result<T, NetError>;

/// Unified error type for neti operations
#[derive(Debug, Error)]
pub enum NetError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("Truncated frame: expected {expected} bytes, {available} available")]
    Truncated { expected: usize, available: usize },

    #[error("Field too large: {len} bytes (max {max})")]
    TooLarge { len: usize, max: usize },

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Registry Errors
    // -------------------------------------------------------------------------
    #[error("Unknown message code {0}: no decoder registered")]
    UnknownCode(u16),

    #[error("Message code {0} already registered")]
    DuplicateCode(u16),

    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("No socket ready, call listen first")]
    NotListening,

    #[error("Already listening")]
    AlreadyListening,

    #[error("Nothing to receive from connection")]
    NothingToReceive,

    #[error("Connection closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Service Errors
    // -------------------------------------------------------------------------
    #[error("No listener registered for service id {0:?}")]
    UnknownService(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
