// Ingest error types and constants

use crate::error::ErrorCode;
use log::warn;
use std::fmt;

/// Ingest error code constants
///
/// Error code range: 3001-3003
pub struct IngestErrorCodes {}

impl IngestErrorCodes {
    /// Inbound frame was not a valid feed message
    pub const MALFORMED_MESSAGE: i32 = 3001;

    /// Inbound frame carried no text payload
    pub const NON_TEXT_FRAME: i32 = 3002;

    /// Engine state lock was poisoned by a panicking reader
    pub const LOCK_POISONED: i32 = 3003;
}

/// Log an ingest error with structured context
///
/// Ingest errors never stop the feed, so they are logged at warn level.
pub fn log_ingest_error(err: &IngestError, context: &str) {
    warn!(
        "Ingest error in {}: code={}, component=FeatureEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while turning an inbound frame into engine state
///
/// None of these are fatal: the offending frame is dropped and the engine
/// keeps its previous state.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestError {
    /// Frame was not valid JSON or lacked a required field
    MalformedMessage { reason: String },

    /// Binary frame whose payload is not UTF-8 text
    NonTextFrame { bytes: usize },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },
}

impl ErrorCode for IngestError {
    fn code(&self) -> i32 {
        match self {
            IngestError::MalformedMessage { .. } => IngestErrorCodes::MALFORMED_MESSAGE,
            IngestError::NonTextFrame { .. } => IngestErrorCodes::NON_TEXT_FRAME,
            IngestError::LockPoisoned { .. } => IngestErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            IngestError::MalformedMessage { reason } => {
                format!("Malformed feed message: {}", reason)
            }
            IngestError::NonTextFrame { bytes } => {
                format!("Binary frame of {} bytes is not UTF-8 text", bytes)
            }
            IngestError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
        }
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IngestError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for IngestError {}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::MalformedMessage {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_error_codes() {
        assert_eq!(
            IngestError::MalformedMessage {
                reason: "x".to_string()
            }
            .code(),
            IngestErrorCodes::MALFORMED_MESSAGE
        );
        assert_eq!(
            IngestError::NonTextFrame { bytes: 4 }.code(),
            IngestErrorCodes::NON_TEXT_FRAME
        );
        assert_eq!(
            IngestError::LockPoisoned {
                component: "engine".to_string()
            }
            .code(),
            IngestErrorCodes::LOCK_POISONED
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: IngestError = json_err.into();

        match &err {
            IngestError::MalformedMessage { reason } => assert!(!reason.is_empty()),
            other => panic!("Expected MalformedMessage, got {:?}", other),
        }
        assert!(err.to_string().contains("code 3001"));
    }

    #[test]
    fn test_messages() {
        let err = IngestError::NonTextFrame { bytes: 12 };
        assert!(err.message().contains("12 bytes"));
    }
}
