//! Error handling module
//!
//! This module defines the error types and result type alias used across
//! the proxy.

use thiserror::Error;
use std::io;

/// Proxy error type
#[derive(Error, Debug)]
pub enum ProxyError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level error (bad address, role misuse, closed endpoint)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The worker failed to bind one of its endpoints
    #[error("Bind failure: {0}")]
    Bind(String),

    /// The control channel closed or produced an unexpected token
    #[error("Handshake failure: {0}")]
    Handshake(String),

    /// The worker did not acknowledge readiness within the start timeout
    #[error("Proxy start timed out waiting for worker acknowledgement")]
    StartTimeout,

    /// The proxy was already started; a controller is single-use
    #[error("Proxy already started")]
    AlreadyStarted,
}

/// Result type alias
///
/// This is a `Result` type alias that uses our custom `ProxyError`.
pub type Result<T> = std::result::Result<T, ProxyError>;
