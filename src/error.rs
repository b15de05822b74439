//! Crate & protocol level errors.
//!
//! This module provides the top-level error types for the seqlog node.
//!
//! # Error Hierarchy
//!
//! The crate uses a two-layer error hierarchy:
//!
//! ## Protocol Layer (`crate::error`)
//!
//! - [`Error`]: Transport, message decoding and RPC errors
//! - [`ErrorCode`]: Wire error codes carried in `error` message bodies
//!
//! ## Storage/Cluster Layer (`crate::cluster::error`)
//!
//! - [`LogError`]: Coordination store and log service errors
//! - Has `to_error_code()` for mapping to [`ErrorCode`]
//!
//! ## Conversion
//!
//! [`Error`] converts into [`LogError`] via `From`, so transport failures
//! observed by the coordination store client propagate to the handlers.
//!
//! [`LogError`]: crate::cluster::LogError

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{io, result};
use thiserror::Error as ThisError;

pub type Result<T> = result::Result<T, Error>;

/// Transport and protocol level errors.
///
/// These are low-level errors that occur during:
/// - stdin/stdout I/O
/// - JSON message decoding
/// - Outbound RPCs to other nodes and services
///
/// For storage and coordination errors, see [`crate::cluster::LogError`].
#[derive(Clone, Debug, ThisError)]
pub enum Error {
    /// An error on the process' standard streams.
    #[error("IO error: {0:?}")]
    IoError(io::ErrorKind),

    /// A message or body could not be decoded.
    #[error("Parsing error: {0}")]
    ParsingError(String),

    /// A message arrived before the `init` handshake completed.
    #[error("Node not initialized: {0}")]
    NotInitialized(String),

    /// An outbound RPC received no reply in time.
    #[error("RPC to {dest} timed out after {timeout_ms}ms")]
    Timeout { dest: String, timeout_ms: u64 },

    /// A remote node answered an RPC with an `error` body.
    #[error("RPC error {code:?}: {text}")]
    Rpc { code: ErrorCode, text: String },

    /// The outbound channel is gone (runtime shutting down).
    #[error("Transport closed: {0}")]
    Closed(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Error::IoError(a), Error::IoError(b)) => a == b,
            (Error::ParsingError(a), Error::ParsingError(b)) => a == b,
            (Error::NotInitialized(a), Error::NotInitialized(b)) => a == b,
            (
                Error::Timeout {
                    dest: a,
                    timeout_ms: x,
                },
                Error::Timeout {
                    dest: b,
                    timeout_ms: y,
                },
            ) => a == b && x == y,
            (Error::Rpc { code: a, text: x }, Error::Rpc { code: b, text: y }) => {
                a == b && x == y
            }
            (Error::Closed(a), Error::Closed(b)) => a == b,
            (Error::Config(a), Error::Config(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::IoError(e.kind())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::ParsingError(e.to_string())
    }
}

impl From<crate::cluster::LogError> for Error {
    fn from(e: crate::cluster::LogError) -> Self {
        use crate::cluster::LogError;
        match e {
            LogError::Config(msg) => Error::Config(msg),
            other => Error::Rpc {
                code: other.to_error_code(),
                text: other.to_string(),
            },
        }
    }
}

/// Error codes carried in `error` message bodies.
///
/// Codes below 1000 are reserved by the protocol; the coordination
/// store services use the same table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive)]
pub enum ErrorCode {
    /// The request timed out. The operation may or may not have happened.
    Timeout = 0,
    /// The destination node does not exist.
    NodeNotFound = 1,
    /// The requested operation is not supported by the receiver.
    NotSupported = 10,
    /// The operation definitely did not happen and is safe to retry.
    TemporarilyUnavailable = 11,
    /// The request body was malformed.
    MalformedRequest = 12,
    /// The receiver failed in an indefinite way.
    Crash = 13,
    /// The operation definitely did not happen.
    Abort = 14,
    /// The key read or updated does not exist.
    KeyDoesNotExist = 20,
    /// The key being created already exists.
    KeyAlreadyExists = 21,
    /// A compare-and-swap precondition did not hold.
    PreconditionFailed = 22,
    /// A transaction aborted due to a conflict.
    TxnConflict = 30,
}

impl ErrorCode {
    /// Numeric wire value.
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Decode a wire value. Unknown codes are treated as indefinite failures.
    pub fn from_code(code: i64) -> Self {
        ErrorCode::from_i64(code).unwrap_or(ErrorCode::Crash)
    }

    /// Whether the receiver guarantees the operation did not take effect.
    pub fn is_definite(self) -> bool {
        !matches!(self, ErrorCode::Timeout | ErrorCode::Crash)
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> result::Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.code())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> result::Result<Self, D::Error> {
        let code = i64::deserialize(deserializer)?;
        Ok(ErrorCode::from_code(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_round_trips_known_values() {
        for code in [0, 1, 10, 11, 12, 13, 14, 20, 21, 22, 30] {
            assert_eq!(ErrorCode::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_unknown_error_code_is_crash() {
        assert_eq!(ErrorCode::from_code(1000), ErrorCode::Crash);
        assert_eq!(ErrorCode::from_code(-5), ErrorCode::Crash);
    }

    #[test]
    fn test_definite_codes() {
        assert!(ErrorCode::PreconditionFailed.is_definite());
        assert!(ErrorCode::TemporarilyUnavailable.is_definite());
        assert!(!ErrorCode::Timeout.is_definite());
        assert!(!ErrorCode::Crash.is_definite());
    }

    #[test]
    fn test_error_code_serializes_as_integer() {
        let json = serde_json::to_string(&ErrorCode::KeyDoesNotExist).unwrap();
        assert_eq!(json, "20");
        let code: ErrorCode = serde_json::from_str("22").unwrap();
        assert_eq!(code, ErrorCode::PreconditionFailed);
    }

    #[test]
    fn test_io_error_conversion_keeps_kind() {
        let err: Error = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert_eq!(err, Error::IoError(io::ErrorKind::BrokenPipe));
    }
}
