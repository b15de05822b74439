//! Offset request handling (commit, list committed).

use std::collections::BTreeMap;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use crate::server::{HandlerResult, RequestContext};
use crate::server::request::{CommitOffsetsRequestData, ListCommittedOffsetsRequestData};
use crate::server::response::{CommitOffsetsResponseData, ListCommittedOffsetsResponseData};
use crate::types::Offset;

use super::LogService;
use crate::cluster::error::{LogError, LogResult};
use crate::cluster::traits::CoordinationStore;

impl<S: CoordinationStore + 'static> LogService<S> {
    /// Record every `(topic, offset)` pair as committed.
    ///
    /// A store failure fails the whole request, though commits for other
    /// topics in the same request may already have been applied.
    pub async fn commit_offsets(&self, offsets: &BTreeMap<String, Offset>) -> LogResult<()> {
        let commits: Vec<(String, Offset)> = offsets
            .iter()
            .map(|(topic, offset)| (topic.clone(), *offset))
            .collect();

        stream::iter(commits)
            .map(move |(topic, offset)| async move { self.commits.commit(&topic, offset).await })
            .buffer_unordered(self.max_concurrent_topic_reads)
            .try_collect::<Vec<()>>()
            .await?;
        Ok(())
    }

    /// Committed offset for each of `topics`, zero when never committed.
    pub async fn list_committed_offsets(
        &self,
        topics: &[String],
    ) -> LogResult<BTreeMap<String, Offset>> {
        stream::iter(topics.to_vec())
            .map(move |topic| async move {
                let offset = self.commits.committed(&topic).await?;
                Ok::<_, LogError>((topic, offset))
            })
            .buffer_unordered(self.max_concurrent_topic_reads)
            .try_collect()
            .await
    }
}

/// Handle a commit_offsets request.
pub(super) async fn handle_commit_offsets<S: CoordinationStore + 'static>(
    service: &LogService<S>,
    ctx: &RequestContext,
    request: CommitOffsetsRequestData,
) -> HandlerResult<CommitOffsetsResponseData> {
    debug!(
        src = %ctx.src,
        offsets = ?request.offsets,
        "COMMIT_OFFSETS request received"
    );

    service.commit_offsets(&request.offsets).await?;
    Ok(CommitOffsetsResponseData::default())
}

/// Handle a list_committed_offsets request.
pub(super) async fn handle_list_committed_offsets<S: CoordinationStore + 'static>(
    service: &LogService<S>,
    ctx: &RequestContext,
    request: ListCommittedOffsetsRequestData,
) -> HandlerResult<ListCommittedOffsetsResponseData> {
    debug!(
        src = %ctx.src,
        keys = ?request.keys,
        "LIST_COMMITTED_OFFSETS request received"
    );

    let offsets = service.list_committed_offsets(&request.keys).await?;
    Ok(ListCommittedOffsetsResponseData { offsets })
}
