//! Key encoding for records kept in the coordination store.
//!
//! # Key Format
//!
//! | Record | Key |
//! |--------|-----|
//! | Tail pointer | `tail_<topic>` |
//! | Log entry | `entry_<topic>_<offset>` |
//! | Committed offset | `commit_<topic>` |
//!
//! Topics are opaque. The offset is always the last `_`-separated component
//! of an entry key and is all digits, so distinct `(topic, offset)` pairs
//! never share a key.

use crate::types::Offset;

/// Prefix for per-topic tail pointer keys.
pub const TAIL_KEY_PREFIX: &str = "tail_";

/// Prefix for log entry keys.
pub const ENTRY_KEY_PREFIX: &str = "entry_";

/// Prefix for committed offset keys.
pub const COMMIT_KEY_PREFIX: &str = "commit_";

/// Key holding the number of offsets allocated for `topic`.
pub fn tail_key(topic: &str) -> String {
    format!("{TAIL_KEY_PREFIX}{topic}")
}

/// Key holding the value stored at `offset` in `topic`.
pub fn entry_key(topic: &str, offset: Offset) -> String {
    format!("{ENTRY_KEY_PREFIX}{topic}_{offset}")
}

/// Key holding the last committed offset for `topic`.
pub fn commit_key(topic: &str) -> String {
    format!("{COMMIT_KEY_PREFIX}{topic}")
}
