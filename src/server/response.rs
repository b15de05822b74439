//! Typed response bodies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::cluster::LogError;
use crate::error::ErrorCode;
use crate::types::Offset;

pub const INIT_OK: &str = "init_ok";
pub const SEND_OK: &str = "send_ok";
pub const POLL_OK: &str = "poll_ok";
pub const COMMIT_OFFSETS_OK: &str = "commit_offsets_ok";
pub const LIST_COMMITTED_OFFSETS_OK: &str = "list_committed_offsets_ok";

/// One polled entry, encoded on the wire as `[offset, value]`.
pub type PolledEntry = (Offset, Number);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponseData {
    pub offset: Offset,
}

/// Entries per requested topic. Every requested topic has a key, even
/// when its list is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollResponseData {
    pub msgs: BTreeMap<String, Vec<PolledEntry>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOffsetsResponseData {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCommittedOffsetsResponseData {
    pub offsets: BTreeMap<String, Offset>,
}

/// Failure reply for a request, sent as an `error` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub text: String,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    /// The receiver does not handle requests of type `kind`.
    pub fn not_supported(kind: &str) -> Self {
        Self::new(
            ErrorCode::NotSupported,
            format!("request type '{kind}' is not supported"),
        )
    }

    pub fn malformed(text: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedRequest, text)
    }

    pub fn crash(text: impl Into<String>) -> Self {
        Self::new(ErrorCode::Crash, text)
    }
}

impl From<LogError> for ErrorResponse {
    fn from(e: LogError) -> Self {
        Self::new(e.to_error_code(), e.to_string())
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({}): {}", self.code, self.code.code(), self.text)
    }
}
