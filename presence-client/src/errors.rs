//! Error types for the presence client.

use std::io;
use thiserror::Error;

/// Errors that can occur during presence client operation.
#[derive(Debug, Error)]
pub enum PresenceClientError {
    /// Transport-level error (socket operations).
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// Connection failed (service socket not found or refused).
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Handshake with the service failed.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Corrupt frame data on the wire (bad opcode, length mismatch,
    /// unparsable payload).
    #[error("Corrupt frame: {0}")]
    CorruptFrame(String),

    /// Operation attempted in a state where it is not legal.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Connection has been closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PresenceClientError {
    /// Returns true if this error is potentially retryable with a fresh
    /// connection.
    ///
    /// Retryable errors are typically transient transport issues (the
    /// service not running yet, a dropped socket). Non-retryable errors
    /// are fatal conditions like configuration mistakes or calling an
    /// operation in the wrong state.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::ConnectionFailed(_)
                | Self::Handshake(_)
                | Self::ConnectionClosed
        )
    }

    /// Returns true if this is a fatal error that should not be retried.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categorization() {
        assert!(
            PresenceClientError::Transport(io::Error::from(io::ErrorKind::ConnectionRefused))
                .is_retryable()
        );
        assert!(PresenceClientError::ConnectionFailed("no socket".to_string()).is_retryable());
        assert!(PresenceClientError::Handshake("timed out".to_string()).is_retryable());

        assert!(PresenceClientError::Config("application id".to_string()).is_fatal());
        assert!(PresenceClientError::InvalidState("not connected".to_string()).is_fatal());
        assert!(PresenceClientError::CorruptFrame("opcode 9".to_string()).is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = PresenceClientError::InvalidState("can only close while connected".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid state: can only close while connected"
        );

        let err = PresenceClientError::CorruptFrame("unrecognized opcode 9".to_string());
        assert!(err.to_string().contains("opcode 9"));
    }
}
