//! Error types for the log service and its coordination store.
//!
//! # Error Handling Patterns
//!
//! ## Absent keys
//!
//! A coordination store reports a missing key as [`LogError::KeyNotFound`].
//! Callers never surface that variant to clients; each call site turns it
//! into its natural default (tail absent ⇒ 0, entry absent ⇒ end of window,
//! commit absent ⇒ 0).
//!
//! ## CAS conflicts
//!
//! [`LogError::CasConflict`] is an expected outcome of optimistic offset
//! allocation and is retried internally. Once the retry budget is spent it
//! becomes [`LogError::ContentionExceeded`].
//!
//! ## Everything else
//!
//! Timeouts, store failures and transport errors fail the request. The
//! client is expected to retry the whole request.

use thiserror::Error;

use crate::error::{Error, ErrorCode};

/// Result type for log service operations.
pub type LogResult<T> = Result<T, LogError>;

/// Errors that can occur in the log service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    /// The coordination store has no value under this key.
    #[error("Key {0} does not exist")]
    KeyNotFound(String),

    /// A compare-and-swap found a different current value.
    #[error("CAS conflict on key {key}")]
    CasConflict { key: String },

    /// Offset allocation gave up after repeated CAS conflicts.
    #[error("Contention exceeded for topic {topic} after {attempts} attempts")]
    ContentionExceeded { topic: String, attempts: u32 },

    /// The coordination store did not answer in time.
    #[error("Coordination store timed out: {0}")]
    Timeout(String),

    /// The coordination store rejected an operation.
    #[error("Coordination store error {code:?}: {text}")]
    Store { code: ErrorCode, text: String },

    /// A stored value had an unexpected shape.
    #[error("Corrupt value under key {key}: {reason}")]
    CorruptValue { key: String, reason: String },

    /// The request body could not be decoded.
    #[error("Malformed request: {0}")]
    Decode(String),

    /// The transport failed underneath the store client.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LogError {
    /// Returns true for the store's "key does not exist" answer.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LogError::KeyNotFound(_))
    }

    /// Returns true for a failed compare-and-swap precondition.
    pub fn is_cas_conflict(&self) -> bool {
        matches!(self, LogError::CasConflict { .. })
    }

    /// Returns true if repeating the same store operation may succeed.
    ///
    /// Used by the entry write retry. CAS conflicts are excluded because
    /// they need a fresh read, not a blind repeat.
    pub fn is_retriable(&self) -> bool {
        match self {
            LogError::Timeout(_) => true,
            LogError::Store { code, .. } => matches!(
                code,
                ErrorCode::TemporarilyUnavailable | ErrorCode::Timeout | ErrorCode::Crash
            ),
            _ => false,
        }
    }

    /// Map to the wire error code replied to clients.
    pub fn to_error_code(&self) -> ErrorCode {
        match self {
            LogError::KeyNotFound(_) => ErrorCode::KeyDoesNotExist,
            LogError::CasConflict { .. } => ErrorCode::PreconditionFailed,
            LogError::ContentionExceeded { .. } => ErrorCode::TemporarilyUnavailable,
            LogError::Timeout(_) => ErrorCode::Timeout,
            LogError::Store { code, .. } => *code,
            LogError::CorruptValue { .. } => ErrorCode::Crash,
            LogError::Decode(_) => ErrorCode::MalformedRequest,
            LogError::Transport(_) | LogError::Config(_) => ErrorCode::Crash,
        }
    }

    /// Label for metrics.
    pub fn as_metric_label(&self) -> &'static str {
        match self {
            LogError::KeyNotFound(_) => "not_found",
            LogError::CasConflict { .. } => "cas_conflict",
            LogError::ContentionExceeded { .. } => "contention",
            LogError::Timeout(_) => "timeout",
            LogError::Store { .. } => "store",
            LogError::CorruptValue { .. } => "corrupt",
            LogError::Decode(_) => "decode",
            LogError::Transport(_) => "transport",
            LogError::Config(_) => "config",
        }
    }

    /// Translate an error reply from the coordination store for `key`.
    pub fn from_store_reply(key: &str, code: ErrorCode, text: String) -> Self {
        match code {
            ErrorCode::KeyDoesNotExist => LogError::KeyNotFound(key.to_string()),
            ErrorCode::PreconditionFailed => LogError::CasConflict {
                key: key.to_string(),
            },
            ErrorCode::Timeout => LogError::Timeout(text),
            code => LogError::Store { code, text },
        }
    }
}

impl From<Error> for LogError {
    fn from(e: Error) -> Self {
        match e {
            Error::Timeout { dest, timeout_ms } => {
                LogError::Timeout(format!("no reply from {dest} within {timeout_ms}ms"))
            }
            Error::Rpc { code, text } => LogError::Store { code, text },
            Error::ParsingError(msg) => LogError::Decode(msg),
            Error::Config(msg) => LogError::Config(msg),
            other => LogError::Transport(other.to_string()),
        }
    }
}
