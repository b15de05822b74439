//! Log service implementing the request [`Handler`] trait.
//!
//! This module is split into submodules by request category:
//! - `send` - Offset allocation and entry append
//! - `poll` - Windowed reads across topics
//! - `offsets` - Commit and list committed offsets
//!
//! Each submodule adds the domain operation to [`LogService`] (returning
//! [`LogResult`]) and a `handle_*` function that adapts it to the wire
//! request and response types.

mod offsets;
mod poll;
mod send;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::constants::SEQ_KV_SERVICE;

use crate::server::request::*;
use crate::server::response::*;
use crate::server::{Handler, HandlerResult, RequestContext};

use super::commit_tracker::{LocalCommitTracker, StoreCommitTracker};
use super::config::{CommitMode, LogConfig};
use super::entry_store::EntryStore;
use super::error::{LogError, LogResult};
use super::offset_allocator::OffsetAllocator;
use super::traits::{CommitTracker, CoordinationStore};

/// Append-only log service over a shared coordination store.
///
/// Holds no mutable state of its own apart from the commit tracker, so any
/// number of instances (on any number of nodes) can serve the same topics
/// as long as they share the store.
pub struct LogService<S: CoordinationStore> {
    pub(crate) allocator: OffsetAllocator<S>,
    pub(crate) entries: EntryStore<S>,
    pub(crate) commits: Arc<dyn CommitTracker>,

    /// Maximum entries returned per topic by one poll.
    pub(crate) poll_window: usize,

    /// Maximum topics read concurrently by one request.
    pub(crate) max_concurrent_topic_reads: usize,
}

impl<S: CoordinationStore + 'static> LogService<S> {
    /// Create a service with the commit tracker selected by `config.commit_mode`.
    pub fn new(config: &LogConfig, store: Arc<S>) -> LogResult<Self> {
        config
            .validate()
            .map_err(|errors| LogError::Config(errors.join("; ")))?;

        if config.kv_service == SEQ_KV_SERVICE {
            warn!(
                kv_service = %config.kv_service,
                "Coordination store is only sequentially consistent, offsets may be reused across nodes"
            );
        }

        let commits: Arc<dyn CommitTracker> = match config.commit_mode {
            CommitMode::Local => Arc::new(LocalCommitTracker::new()),
            CommitMode::Store => Arc::new(StoreCommitTracker::new(Arc::clone(&store))),
        };

        info!(
            kv_service = %config.kv_service,
            commit_mode = %config.commit_mode,
            poll_window = config.poll_window,
            cas_max_attempts = config.cas_retry.max_attempts,
            "Log service created"
        );

        Ok(Self::with_commit_tracker(config, store, commits))
    }

    /// Create a service with an explicit commit tracker.
    ///
    /// `config.commit_mode` is ignored. The configuration is not validated.
    pub fn with_commit_tracker(
        config: &LogConfig,
        store: Arc<S>,
        commits: Arc<dyn CommitTracker>,
    ) -> Self {
        Self {
            allocator: OffsetAllocator::new(Arc::clone(&store), config.cas_retry.clone()),
            entries: EntryStore::new(store),
            commits,
            poll_window: config.poll_window,
            max_concurrent_topic_reads: config.max_concurrent_topic_reads.max(1),
        }
    }
}

#[async_trait]
impl<S: CoordinationStore + 'static> Handler for LogService<S> {
    #[tracing::instrument(skip(self, ctx, request), fields(request_id = %ctx.request_id, topic = %request.key))]
    async fn handle_send(
        &self,
        ctx: &RequestContext,
        request: SendRequestData,
    ) -> HandlerResult<SendResponseData> {
        send::handle_send(self, ctx, request).await
    }

    #[tracing::instrument(skip(self, ctx, request), fields(request_id = %ctx.request_id, topic_count = request.offsets.len()))]
    async fn handle_poll(
        &self,
        ctx: &RequestContext,
        request: PollRequestData,
    ) -> HandlerResult<PollResponseData> {
        poll::handle_poll(self, ctx, request).await
    }

    #[tracing::instrument(skip(self, ctx, request), fields(request_id = %ctx.request_id, topic_count = request.offsets.len()))]
    async fn handle_commit_offsets(
        &self,
        ctx: &RequestContext,
        request: CommitOffsetsRequestData,
    ) -> HandlerResult<CommitOffsetsResponseData> {
        offsets::handle_commit_offsets(self, ctx, request).await
    }

    #[tracing::instrument(skip(self, ctx, request), fields(request_id = %ctx.request_id, topic_count = request.keys.len()))]
    async fn handle_list_committed_offsets(
        &self,
        ctx: &RequestContext,
        request: ListCommittedOffsetsRequestData,
    ) -> HandlerResult<ListCommittedOffsetsResponseData> {
        offsets::handle_list_committed_offsets(self, ctx, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MemoryStore;
    use crate::server::{Body, Message, route};
    use crate::types::Offset;
    use serde_json::{Number, Value, json};

    /// Route `body` from client `c1` on a spawned task, so the handler
    /// future must be `Send`.
    async fn route_spawned(service: &Arc<LogService<MemoryStore>>, body: Value) -> Body {
        let message: Message =
            serde_json::from_value(json!({"src": "c1", "dest": "n1", "body": body})).unwrap();
        let service = Arc::clone(service);
        tokio::spawn(async move {
            let ctx = RequestContext::new("n1", &message);
            route(service.as_ref(), &ctx, &message.body).await
        })
        .await
        .unwrap()
        .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = LogConfig {
            poll_window: 0,
            ..Default::default()
        };
        let err = LogService::new(&config, Arc::new(MemoryStore::new())).err();
        assert!(matches!(err, Some(LogError::Config(msg)) if msg.contains("poll_window")));
    }

    #[tokio::test]
    async fn test_local_commit_mode_is_node_local() {
        let store = Arc::new(MemoryStore::new());
        let config = LogConfig {
            commit_mode: CommitMode::Local,
            ..Default::default()
        };
        let a = LogService::new(&config, store.clone()).unwrap();
        let b = LogService::new(&config, store.clone()).unwrap();

        a.commits.commit("t", Offset(3)).await.unwrap();
        assert_eq!(a.commits.committed("t").await.unwrap(), Offset(3));
        assert_eq!(b.commits.committed("t").await.unwrap(), Offset::ZERO);
        assert_eq!(store.get("commit_t").await, None);
    }

    #[tokio::test]
    async fn test_store_commit_mode_is_shared() {
        let store = Arc::new(MemoryStore::new());
        let config = LogConfig::default();
        let a = LogService::new(&config, store.clone()).unwrap();
        let b = LogService::new(&config, store).unwrap();

        a.commits.commit("t", Offset(3)).await.unwrap();
        assert_eq!(b.commits.committed("t").await.unwrap(), Offset(3));
    }

    #[tokio::test]
    async fn test_multi_topic_requests_run_on_spawned_tasks() {
        let store = Arc::new(MemoryStore::new());
        let service = Arc::new(LogService::new(&LogConfig::default(), store).unwrap());
        service.send("a", &Number::from(1)).await.unwrap();
        service.send("b", &Number::from(2)).await.unwrap();

        let reply = route_spawned(
            &service,
            json!({"type": POLL, "msg_id": 1, "offsets": {"a": 0, "b": 0, "c": 0}}),
        )
        .await;
        assert_eq!(reply.kind, POLL_OK);
        assert_eq!(
            reply.fields["msgs"],
            json!({"a": [[0, 1]], "b": [[0, 2]], "c": []})
        );

        let reply = route_spawned(
            &service,
            json!({"type": COMMIT_OFFSETS, "msg_id": 2, "offsets": {"a": 1, "b": 1}}),
        )
        .await;
        assert_eq!(reply.kind, COMMIT_OFFSETS_OK);

        let reply = route_spawned(
            &service,
            json!({"type": LIST_COMMITTED_OFFSETS, "msg_id": 3, "keys": ["a", "b", "c"]}),
        )
        .await;
        assert_eq!(reply.kind, LIST_COMMITTED_OFFSETS_OK);
        assert_eq!(reply.fields["offsets"], json!({"a": 1, "b": 1, "c": 0}));
    }
}
