//! Storage of individual log entries.
//!
//! Each entry lives under its own key, `entry_<topic>_<offset>`, so two
//! nodes appending to the same topic never touch the same key once their
//! offsets are allocated.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use backon::Retryable;
use serde_json::{Number, Value};
use tracing::debug;

use super::error::{LogError, LogResult};
use super::keys::entry_key;
use super::retry::{
    record_retry_attempt, record_retry_exhausted, record_retry_success, storage_policy,
};
use super::traits::CoordinationStore;
use crate::types::Offset;

const POLICY_NAME: &str = "entry_write";

/// Reads and writes `(topic, offset) -> value` records.
pub struct EntryStore<S: CoordinationStore> {
    store: Arc<S>,
}

impl<S: CoordinationStore> EntryStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Write the value at `offset` of `topic`.
    ///
    /// Transient store failures are retried with the storage policy. The
    /// offset is already allocated at this point, so giving up leaves a gap
    /// that polls stop at.
    pub async fn put(&self, topic: &str, offset: Offset, value: &Number) -> LogResult<()> {
        let key = entry_key(topic, offset);
        let key = key.as_str();
        let value = Value::Number(value.clone());
        let value = &value;
        let attempts = AtomicU32::new(0);
        let counter = &attempts;

        let result = (|| async move {
            counter.fetch_add(1, Ordering::Relaxed);
            self.store.write(key, value.clone()).await
        })
        .retry(storage_policy())
        .when(LogError::is_retriable)
        .notify(|err, delay| {
            record_retry_attempt(POLICY_NAME, counter.load(Ordering::Relaxed));
            debug!(key, error = %err, delay_ms = delay.as_millis() as u64, "Entry write failed, retrying");
        })
        .await;

        match &result {
            Err(e) if e.is_retriable() => record_retry_exhausted(POLICY_NAME),
            Ok(()) if attempts.load(Ordering::Relaxed) > 1 => record_retry_success(POLICY_NAME),
            _ => {}
        }
        result
    }

    /// Read the value at `offset` of `topic`, `None` if nothing is stored there.
    pub async fn get(&self, topic: &str, offset: Offset) -> LogResult<Option<Number>> {
        let key = entry_key(topic, offset);
        match self.store.try_read(&key).await? {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(Some(n)),
            Some(other) => Err(LogError::CorruptValue {
                key,
                reason: format!("expected number, found {other}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MemoryStore;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_then_get() {
        let store = Arc::new(MemoryStore::new());
        let entries = EntryStore::new(store.clone());

        entries.put("a", Offset(0), &Number::from(10)).await.unwrap();
        assert_eq!(store.get("entry_a_0").await, Some(json!(10)));
        assert_eq!(
            entries.get("a", Offset(0)).await.unwrap(),
            Some(Number::from(10))
        );
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let entries = EntryStore::new(Arc::new(MemoryStore::new()));
        assert_eq!(entries.get("a", Offset(3)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_retries_transient_failures() {
        let store = Arc::new(MemoryStore::new());
        store.fail_next(2, ErrorCode::TemporarilyUnavailable);
        let entries = EntryStore::new(store.clone());

        entries.put("a", Offset(0), &Number::from(1)).await.unwrap();
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_put_does_not_retry_definite_failures() {
        let store = Arc::new(MemoryStore::new());
        store.fail_next(1, ErrorCode::Abort);
        let entries = EntryStore::new(store.clone());

        assert!(entries.put("a", Offset(0), &Number::from(1)).await.is_err());
        assert_eq!(store.writes(), 0);
        assert_eq!(store.get("entry_a_0").await, None);
    }

    #[tokio::test]
    async fn test_get_propagates_store_errors() {
        let store = Arc::new(MemoryStore::new());
        store.fail_next(1, ErrorCode::Crash);
        let entries = EntryStore::new(store);
        assert!(entries.get("a", Offset(0)).await.is_err());
    }

    #[tokio::test]
    async fn test_get_rejects_non_numeric_values() {
        let store = Arc::new(MemoryStore::new());
        store.write("entry_a_0", json!("text")).await.unwrap();
        let entries = EntryStore::new(store);
        assert!(matches!(
            entries.get("a", Offset(0)).await,
            Err(LogError::CorruptValue { .. })
        ));
    }

    #[tokio::test]
    async fn test_float_values_survive() {
        let store = Arc::new(MemoryStore::new());
        let entries = EntryStore::new(store);
        let value: Number = serde_json::from_str("2.5").unwrap();
        entries.put("a", Offset(0), &value).await.unwrap();
        assert_eq!(entries.get("a", Offset(0)).await.unwrap(), Some(value));
    }
}
