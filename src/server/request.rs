//! Typed request bodies.
//!
//! Each struct holds the type-specific fields of one request body; the
//! envelope and the `type` / `msg_id` fields live on
//! [`Body`](super::Body).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::types::Offset;

pub const INIT: &str = "init";
pub const SEND: &str = "send";
pub const POLL: &str = "poll";
pub const COMMIT_OFFSETS: &str = "commit_offsets";
pub const LIST_COMMITTED_OFFSETS: &str = "list_committed_offsets";

/// Cluster membership handshake, always the first message a node sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitRequestData {
    pub node_id: String,
    pub node_ids: Vec<String>,
}

/// Append `msg` to the log named `key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendRequestData {
    pub key: String,
    pub msg: Number,
}

/// Read a window of entries from each topic, starting at the given offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollRequestData {
    pub offsets: BTreeMap<String, Offset>,
}

/// Record consumer progress per topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOffsetsRequestData {
    pub offsets: BTreeMap<String, Offset>,
}

/// Ask for the committed offset of each listed topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCommittedOffsetsRequestData {
    pub keys: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_send_keeps_integer_values() {
        let req: SendRequestData = serde_json::from_value(json!({"key": "a", "msg": 10})).unwrap();
        assert_eq!(req.key, "a");
        assert!(req.msg.is_u64());
        assert_eq!(serde_json::to_value(&req.msg).unwrap(), json!(10));
    }

    #[test]
    fn test_send_rejects_non_numeric_msg() {
        assert!(serde_json::from_value::<SendRequestData>(json!({"key": "a", "msg": "x"})).is_err());
        assert!(serde_json::from_value::<SendRequestData>(json!({"key": "a"})).is_err());
    }

    #[test]
    fn test_poll_offsets() {
        let req: PollRequestData =
            serde_json::from_value(json!({"offsets": {"a": 0, "b": 5}})).unwrap();
        assert_eq!(req.offsets.get("b"), Some(&Offset(5)));
    }

    #[test]
    fn test_negative_offsets_rejected() {
        assert!(
            serde_json::from_value::<CommitOffsetsRequestData>(json!({"offsets": {"a": -1}}))
                .is_err()
        );
    }
}
