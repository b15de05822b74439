//! Committed consumer offset tracking.
//!
//! Two [`CommitTracker`] implementations:
//!
//! - [`LocalCommitTracker`]: a mutex-guarded map inside this process. Each
//!   node only reports commits it received itself.
//! - [`StoreCommitTracker`]: one `commit_<topic>` key per topic in the
//!   coordination store, visible to every node.
//!
//! Both are last-write-wins; a commit to a lower offset than the current
//! one is accepted as given.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use super::error::LogResult;
use super::keys::commit_key;
use super::traits::{CommitTracker, CoordinationStore};
use crate::types::Offset;

/// Node-local commit tracking.
#[derive(Debug, Default)]
pub struct LocalCommitTracker {
    offsets: Mutex<HashMap<String, Offset>>,
}

impl LocalCommitTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommitTracker for LocalCommitTracker {
    async fn commit(&self, topic: &str, offset: Offset) -> LogResult<()> {
        self.offsets.lock().await.insert(topic.to_string(), offset);
        debug!(topic, %offset, "Committed offset (local)");
        Ok(())
    }

    async fn committed(&self, topic: &str) -> LogResult<Offset> {
        Ok(self
            .offsets
            .lock()
            .await
            .get(topic)
            .copied()
            .unwrap_or_default())
    }
}

/// Commit tracking shared through the coordination store.
pub struct StoreCommitTracker<S: CoordinationStore> {
    store: Arc<S>,
}

impl<S: CoordinationStore> StoreCommitTracker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: CoordinationStore> CommitTracker for StoreCommitTracker<S> {
    async fn commit(&self, topic: &str, offset: Offset) -> LogResult<()> {
        self.store
            .write(&commit_key(topic), Value::from(offset.value()))
            .await?;
        debug!(topic, %offset, "Committed offset (store)");
        Ok(())
    }

    async fn committed(&self, topic: &str) -> LogResult<Offset> {
        Ok(Offset(
            self.store.read_u64(&commit_key(topic)).await?.unwrap_or(0),
        ))
    }
}
