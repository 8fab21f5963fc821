//! Error types for the RFB client.

use std::io;
use thiserror::Error;

/// Errors that end an RFB decoding session.
#[derive(Debug, Error)]
pub enum RfbClientError {
    /// Transport-level error (read/write on the underlying stream).
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// Protocol error (malformed message, unexpected data).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Rectangle decoding error.
    #[error("Encoding error: {0:#}")]
    Encoding(#[from] anyhow::Error),

    /// Rectangle encoded with an encoding this client cannot decode.
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(i32),

    /// Unexpected message from server.
    #[error("Unexpected message: {0}")]
    UnexpectedMessage(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection has been closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Internal error (should not happen in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RfbClientError {
    /// Returns true if reconnecting could succeed.
    ///
    /// Only transport failures qualify. Everything else describes a server
    /// that sent data this client will never accept, or a local mistake.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if this is a fatal error that should not be retried.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.is_retryable()
    }
}

/// Result alias used throughout the client.
pub type Result<T> = std::result::Result<T, RfbClientError>;
