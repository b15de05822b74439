//! Type-safe wrappers for log primitives.
//!
//! These newtypes keep offsets and message ids from being mixed up with
//! other integers that share the same representation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of an entry within a topic's log.
///
/// Offsets are zero-based and dense: a topic holding `k` entries has
/// exactly the offsets `0..k`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Offset(pub u64);

impl Offset {
    /// The first offset of every topic.
    pub const ZERO: Self = Offset(0);

    /// Create a new offset from a raw value.
    #[inline]
    pub const fn new(value: u64) -> Self {
        Offset(value)
    }

    /// Get the raw u64 value.
    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The offset immediately after this one.
    #[inline]
    pub const fn next(self) -> Self {
        Offset(self.0 + 1)
    }
}

impl From<u64> for Offset {
    fn from(value: u64) -> Self {
        Offset(value)
    }
}

impl From<Offset> for u64 {
    fn from(offset: Offset) -> Self {
        offset.0
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-node message identifier used to correlate replies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MsgId(pub u64);

impl MsgId {
    /// Get the raw u64 value.
    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for MsgId {
    fn from(value: u64) -> Self {
        MsgId(value)
    }
}

impl fmt::Display for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
