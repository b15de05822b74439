//! In-memory coordination store.
//!
//! This provides a linearizable in-process implementation of
//! [`CoordinationStore`] for single-node mode and for testing without a
//! remote KV service.
//!
//! Clones share state, so several [`LogService`](super::LogService)
//! instances built over clones of one store behave like separate nodes
//! talking to the same coordination service.
//!
//! # Fault Injection
//!
//! Tests can make the next operations fail ([`MemoryStore::fail_next`]),
//! force CAS conflicts ([`MemoryStore::conflict_next_cas`]) or add latency
//! to widen race windows ([`MemoryStore::with_latency`]).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::error::{LogError, LogResult};
use super::traits::CoordinationStore;
use crate::error::ErrorCode;

/// Store operation kinds, for targeted fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Read,
    Write,
    Cas,
}

/// Injected failure for the next store operations.
#[derive(Debug, Clone, Copy)]
struct InjectedFailure {
    remaining: u32,
    code: ErrorCode,
    /// Only fail this kind of operation; `None` fails every kind.
    op: Option<StoreOp>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// Shared key-value state.
    pub data: Arc<RwLock<HashMap<String, Value>>>,
    /// Pending injected failures (applies to every operation type).
    failures: Arc<std::sync::Mutex<Option<InjectedFailure>>>,
    /// Number of CAS calls that must conflict regardless of state.
    forced_conflicts: Arc<AtomicU32>,
    /// Artificial latency before each operation.
    latency: Option<Duration>,
    /// Total CAS calls.
    cas_attempts: Arc<AtomicU64>,
    /// CAS calls that failed their precondition.
    cas_conflicts: Arc<AtomicU64>,
    /// Total writes.
    writes: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fixed delay before every operation.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail the next `count` operations with `code`.
    pub fn fail_next(&self, count: u32, code: ErrorCode) {
        self.inject(count, code, None);
    }

    /// Fail the next `count` operations of kind `op` with `code`.
    pub fn fail_next_op(&self, op: StoreOp, count: u32, code: ErrorCode) {
        self.inject(count, code, Some(op));
    }

    fn inject(&self, count: u32, code: ErrorCode, op: Option<StoreOp>) {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        *failures = (count > 0).then_some(InjectedFailure {
            remaining: count,
            code,
            op,
        });
    }

    /// Make the next `count` CAS calls report a conflict.
    pub fn conflict_next_cas(&self, count: u32) {
        self.forced_conflicts.store(count, Ordering::SeqCst);
    }

    /// Total CAS calls observed.
    pub fn cas_attempts(&self) -> u64 {
        self.cas_attempts.load(Ordering::SeqCst)
    }

    /// CAS calls that conflicted.
    pub fn cas_conflicts(&self) -> u64 {
        self.cas_conflicts.load(Ordering::SeqCst)
    }

    /// Total writes observed.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Get a copy of the value under `key` for test verification.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.data.read().await.get(key).cloned()
    }

    /// Number of keys currently stored.
    pub async fn key_count(&self) -> usize {
        self.data.read().await.len()
    }

    async fn before_op(&self, op: StoreOp, key: &str) -> LogResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(failure) = failures.as_mut() {
            if failure.remaining > 0 && failure.op.is_none_or(|target| target == op) {
                failure.remaining -= 1;
                let code = failure.code;
                if failure.remaining == 0 {
                    *failures = None;
                }
                return Err(LogError::from_store_reply(
                    key,
                    code,
                    "injected failure".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn take_forced_conflict(&self) -> bool {
        self.forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl CoordinationStore for MemoryStore {
    async fn read(&self, key: &str) -> LogResult<Value> {
        self.before_op(StoreOp::Read, key).await?;
        self.data
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| LogError::KeyNotFound(key.to_string()))
    }

    async fn write(&self, key: &str, value: Value) -> LogResult<()> {
        self.before_op(StoreOp::Write, key).await?;
        self.data.write().await.insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        from: Value,
        to: Value,
        create_if_absent: bool,
    ) -> LogResult<()> {
        self.before_op(StoreOp::Cas, key).await?;
        self.cas_attempts.fetch_add(1, Ordering::SeqCst);

        if self.take_forced_conflict() {
            self.cas_conflicts.fetch_add(1, Ordering::SeqCst);
            return Err(LogError::CasConflict {
                key: key.to_string(),
            });
        }

        let mut data = self.data.write().await;
        match data.get(key) {
            Some(current) if *current == from => {
                data.insert(key.to_string(), to);
                Ok(())
            }
            Some(_) => {
                self.cas_conflicts.fetch_add(1, Ordering::SeqCst);
                Err(LogError::CasConflict {
                    key: key.to_string(),
                })
            }
            None if create_if_absent => {
                data.insert(key.to_string(), to);
                Ok(())
            }
            None => Err(LogError::KeyNotFound(key.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_read_missing_key() {
        let store = MemoryStore::new();
        let err = store.read("nope").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.try_read("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let store = MemoryStore::new();
        store.write("k", json!(5)).await.unwrap();
        assert_eq!(store.read("k").await.unwrap(), json!(5));
        assert_eq!(store.read_u64("k").await.unwrap(), Some(5));
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_cas_semantics() {
        let store = MemoryStore::new();

        // Absent without create
        let err = store
            .compare_and_swap("k", json!(0), json!(1), false)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        // Absent with create
        store
            .compare_and_swap("k", json!(0), json!(1), true)
            .await
            .unwrap();
        assert_eq!(store.get("k").await, Some(json!(1)));

        // Stale expectation
        let err = store
            .compare_and_swap("k", json!(0), json!(1), true)
            .await
            .unwrap_err();
        assert!(err.is_cas_conflict());

        // Matching expectation
        store
            .compare_and_swap("k", json!(1), json!(2), false)
            .await
            .unwrap();
        assert_eq!(store.get("k").await, Some(json!(2)));
        assert_eq!(store.cas_attempts(), 4);
        assert_eq!(store.cas_conflicts(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let a = MemoryStore::new();
        let b = a.clone();
        a.write("shared", json!("x")).await.unwrap();
        assert_eq!(b.read("shared").await.unwrap(), json!("x"));
        assert_eq!(b.key_count().await, 1);
    }

    #[tokio::test]
    async fn test_injected_failures_expire() {
        let store = MemoryStore::new();
        store.fail_next(2, ErrorCode::TemporarilyUnavailable);

        assert!(store.write("k", json!(1)).await.is_err());
        assert!(store.read("k").await.is_err());
        store.write("k", json!(1)).await.unwrap();
        assert_eq!(store.read("k").await.unwrap(), json!(1));
    }

    #[tokio::test]
    async fn test_targeted_failures_skip_other_ops() {
        let store = MemoryStore::new();
        store.fail_next_op(StoreOp::Write, 1, ErrorCode::Abort);

        assert!(store.read("k").await.unwrap_err().is_not_found());
        assert!(store.write("k", json!(1)).await.is_err());
        store.write("k", json!(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_forced_conflicts() {
        let store = MemoryStore::new();
        store.conflict_next_cas(1);
        assert!(
            store
                .compare_and_swap("k", json!(0), json!(1), true)
                .await
                .unwrap_err()
                .is_cas_conflict()
        );
        store
            .compare_and_swap("k", json!(0), json!(1), true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_read_u64_rejects_non_integers() {
        let store = MemoryStore::new();
        store.write("k", json!("text")).await.unwrap();
        assert!(matches!(
            store.read_u64("k").await,
            Err(LogError::CorruptValue { .. })
        ));
    }
}
