//! Traits for the coordination layer.
//!
//! These traits abstract the stores the log service is built on, allowing:
//! - A remote coordination store for multi-node deployments
//! - An in-process store for single-node mode and tests
//! - Injection of the commit tracking strategy
//!
//! # Available Implementations
//!
//! - [`KvClient`](super::KvClient): RPC client for a linearizable KV service
//! - [`MemoryStore`](super::MemoryStore): In-memory store with fault injection
//! - [`LocalCommitTracker`](super::LocalCommitTracker): Mutex-guarded map, node-local
//! - [`StoreCommitTracker`](super::StoreCommitTracker): Commits kept in a coordination store
//!
//! # Trait Hierarchy
//!
//! - [`CoordinationStore`]: Linearizable read / write / compare-and-swap
//! - [`CommitTracker`]: Per-topic committed consumer offsets

use async_trait::async_trait;
use serde_json::Value;

use super::error::{LogError, LogResult};
use crate::types::Offset;

/// Linearizable key-value store shared by every node in the cluster.
///
/// All offset allocation and entry storage goes through this trait. The
/// correctness of offset allocation depends entirely on
/// [`compare_and_swap`](CoordinationStore::compare_and_swap) being
/// linearizable across all nodes.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Read the value under `key`.
    ///
    /// Returns `Err(LogError::KeyNotFound)` if the key has never been written.
    async fn read(&self, key: &str) -> LogResult<Value>;

    /// Unconditionally store `value` under `key`.
    async fn write(&self, key: &str, value: Value) -> LogResult<()>;

    /// Atomically replace `from` with `to` under `key`.
    ///
    /// # Returns
    /// - `Ok(())` if the swap happened
    /// - `Err(LogError::CasConflict)` if the current value is not `from`
    /// - `Err(LogError::KeyNotFound)` if the key is absent and
    ///   `create_if_absent` is false
    ///
    /// With `create_if_absent`, an absent key is created holding `to`.
    async fn compare_and_swap(
        &self,
        key: &str,
        from: Value,
        to: Value,
        create_if_absent: bool,
    ) -> LogResult<()>;

    /// Read `key`, translating "key not found" into `None`.
    async fn try_read(&self, key: &str) -> LogResult<Option<Value>> {
        match self.read(key).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Read a non-negative integer under `key`, `None` if absent.
    async fn read_u64(&self, key: &str) -> LogResult<Option<u64>> {
        match self.try_read(key).await? {
            None => Ok(None),
            Some(value) => value.as_u64().map(Some).ok_or_else(|| LogError::CorruptValue {
                key: key.to_string(),
                reason: format!("expected non-negative integer, found {value}"),
            }),
        }
    }
}

/// Tracker for per-topic committed consumer offsets.
///
/// Commit offsets are advisory, so the choice between node-local and
/// store-backed tracking is a deployment decision.
///
/// Commits are last-write-wins. No ordering is provided between
/// concurrent commits for the same topic; callers that need ordering must
/// serialize their own commit calls.
#[async_trait]
pub trait CommitTracker: Send + Sync {
    /// Record `offset` as the committed offset for `topic`.
    async fn commit(&self, topic: &str, offset: Offset) -> LogResult<()>;

    /// Get the committed offset for `topic`, `Offset::ZERO` if never committed.
    async fn committed(&self, topic: &str) -> LogResult<Offset>;
}
