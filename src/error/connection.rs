// Connection error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Connection error code constants
///
/// Error code range: 4001-4005
pub struct ConnectionErrorCodes {}

impl ConnectionErrorCodes {
    /// Feed URL could not be parsed
    pub const INVALID_URL: i32 = 4001;

    /// WebSocket handshake or TCP connect failed
    pub const CONNECT_FAILED: i32 = 4002;

    /// Reading from an established connection failed
    pub const RECEIVE_FAILED: i32 = 4003;

    /// Connection was closed by the peer
    pub const CLOSED: i32 = 4004;

    /// Replay recording could not be read
    pub const REPLAY_READ: i32 = 4005;
}

/// Log a connection error with structured context
pub fn log_connection_error(err: &ConnectionError, context: &str) {
    error!(
        "Connection error in {}: code={}, component=MessageSource, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised by message sources
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionError {
    /// Feed URL is not a valid ws:// URL
    InvalidUrl { url: String, reason: String },

    /// Could not establish the connection
    ConnectFailed { url: String, reason: String },

    /// Established connection failed while receiving
    ReceiveFailed { reason: String },

    /// Peer closed the connection
    Closed,

    /// Replay file could not be opened or read
    ReplayRead { path: String, reason: String },
}

impl ErrorCode for ConnectionError {
    fn code(&self) -> i32 {
        match self {
            ConnectionError::InvalidUrl { .. } => ConnectionErrorCodes::INVALID_URL,
            ConnectionError::ConnectFailed { .. } => ConnectionErrorCodes::CONNECT_FAILED,
            ConnectionError::ReceiveFailed { .. } => ConnectionErrorCodes::RECEIVE_FAILED,
            ConnectionError::Closed => ConnectionErrorCodes::CLOSED,
            ConnectionError::ReplayRead { .. } => ConnectionErrorCodes::REPLAY_READ,
        }
    }

    fn message(&self) -> String {
        match self {
            ConnectionError::InvalidUrl { url, reason } => {
                format!("Invalid feed URL '{}': {}", url, reason)
            }
            ConnectionError::ConnectFailed { url, reason } => {
                format!("Failed to connect to {}: {}", url, reason)
            }
            ConnectionError::ReceiveFailed { reason } => {
                format!("Failed to receive frame: {}", reason)
            }
            ConnectionError::Closed => "Connection closed by peer".to_string(),
            ConnectionError::ReplayRead { path, reason } => {
                format!("Failed to read recording {}: {}", path, reason)
            }
        }
    }
}

impl ConnectionError {
    /// Whether reconnecting could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConnectionError::ConnectFailed { .. }
                | ConnectionError::ReceiveFailed { .. }
                | ConnectionError::Closed
        )
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConnectionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConnectionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_codes() {
        assert_eq!(
            ConnectionError::InvalidUrl {
                url: "x".to_string(),
                reason: "y".to_string()
            }
            .code(),
            ConnectionErrorCodes::INVALID_URL
        );
        assert_eq!(ConnectionError::Closed.code(), ConnectionErrorCodes::CLOSED);
        assert_eq!(
            ConnectionError::ReplayRead {
                path: "a".to_string(),
                reason: "b".to_string()
            }
            .code(),
            ConnectionErrorCodes::REPLAY_READ
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(ConnectionError::Closed.is_transient());
        assert!(ConnectionError::ReceiveFailed {
            reason: "reset".to_string()
        }
        .is_transient());
        assert!(!ConnectionError::InvalidUrl {
            url: "http://x".to_string(),
            reason: "scheme".to_string()
        }
        .is_transient());
    }

    #[test]
    fn test_error_code_trait_object() {
        let err: &dyn ErrorCode = &ConnectionError::Closed;
        assert_eq!(err.code(), 4004);
        assert!(err.message().contains("closed"));
    }

    #[test]
    fn test_error_propagation() {
        fn may_fail() -> Result<(), ConnectionError> {
            Err(ConnectionError::Closed)
        }

        fn caller() -> Result<(), ConnectionError> {
            may_fail()?;
            Ok(())
        }

        assert!(caller().is_err());
    }
}
