// Error types for the moodscope client
//
// This module defines custom error types for ingest and connection
// operations, providing structured error handling with numeric error codes
// that telemetry and the debug HTTP surface report verbatim.

mod connection;
mod ingest;

pub use connection::{log_connection_error, ConnectionError, ConnectionErrorCodes};
pub use ingest::{log_ingest_error, IngestError, IngestErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent handling across the
/// CLI, telemetry and HTTP boundaries.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
