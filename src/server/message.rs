//! Message envelope for the line-delimited JSON protocol.
//!
//! Every line on stdin and stdout is one [`Message`]:
//!
//! ```json
//! {"src": "c1", "dest": "n1", "body": {"type": "send", "msg_id": 1, "key": "a", "msg": 10}}
//! ```
//!
//! The body keeps its type-specific fields as an untyped map. Handlers
//! decode them into typed request structs with [`Body::decode`], and
//! replies are built from typed response structs with [`Body::encode`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, ErrorCode, Result};
use crate::types::MsgId;

/// Body type of an error reply.
pub const ERROR: &str = "error";

/// A single protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub src: String,
    pub dest: String,
    pub body: Body,
}

/// Message body: the type tag, correlation ids and type-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<MsgId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<MsgId>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Message {
    /// Parse one input line.
    pub fn from_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }

    /// Render as one output line, without the trailing newline.
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Body {
    /// Body with no type-specific fields.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            msg_id: None,
            in_reply_to: None,
            fields: Map::new(),
        }
    }

    /// Body whose fields are the serialized form of `payload`.
    ///
    /// `payload` must serialize to a JSON object (or unit, for empty bodies).
    pub fn encode<T: Serialize>(kind: impl Into<String>, payload: &T) -> Result<Self> {
        let fields = match serde_json::to_value(payload)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(Error::ParsingError(format!(
                    "body payload must be an object, got {other}"
                )));
            }
        };
        Ok(Self {
            fields,
            ..Self::new(kind)
        })
    }

    /// Decode the type-specific fields into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.fields.clone()))
            .map_err(|e| Error::ParsingError(format!("invalid {} body: {e}", self.kind)))
    }

    /// An `error` body carrying `code` and `text`.
    pub fn error(code: ErrorCode, text: impl Into<String>) -> Self {
        let mut body = Self::new(ERROR);
        body.fields.insert("code".to_string(), Value::from(code.code()));
        body.fields
            .insert("text".to_string(), Value::String(text.into()));
        body
    }

    /// Returns true if this is an `error` body.
    pub fn is_error(&self) -> bool {
        self.kind == ERROR
    }

    /// Extract `(code, text)` from an `error` body.
    ///
    /// A missing or unknown code is reported as [`ErrorCode::Crash`].
    pub fn as_error(&self) -> Option<(ErrorCode, String)> {
        if !self.is_error() {
            return None;
        }
        let code = self
            .fields
            .get("code")
            .and_then(Value::as_i64)
            .map(ErrorCode::from_code)
            .unwrap_or(ErrorCode::Crash);
        let text = self
            .fields
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some((code, text))
    }

    pub fn with_msg_id(mut self, msg_id: MsgId) -> Self {
        self.msg_id = Some(msg_id);
        self
    }

    pub fn with_in_reply_to(mut self, in_reply_to: Option<MsgId>) -> Self {
        self.in_reply_to = in_reply_to;
        self
    }
}
