//! Poll request handling.

use std::collections::BTreeMap;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use crate::server::{HandlerResult, RequestContext};
use crate::server::request::PollRequestData;
use crate::server::response::{PollResponseData, PolledEntry};
use crate::types::Offset;

use super::LogService;
use crate::cluster::error::{LogError, LogResult};
use crate::cluster::metrics::ENTRIES_POLLED;
use crate::cluster::traits::CoordinationStore;

impl<S: CoordinationStore + 'static> LogService<S> {
    /// Read up to `poll_window` consecutive entries of each topic, starting
    /// at the requested offset.
    ///
    /// Every requested topic appears in the result. A topic's list stops at
    /// the first offset with no entry, so it may be shorter than the window
    /// or empty.
    pub async fn poll(
        &self,
        offsets: &BTreeMap<String, Offset>,
    ) -> LogResult<BTreeMap<String, Vec<PolledEntry>>> {
        // Owned items keep the stream closure free of borrowed arguments, so
        // the returned future stays `Send` behind `async_trait`.
        let starts: Vec<(String, Offset)> = offsets
            .iter()
            .map(|(topic, start)| (topic.clone(), *start))
            .collect();

        let msgs: BTreeMap<String, Vec<PolledEntry>> = stream::iter(starts)
            .map(move |(topic, start)| async move {
                let entries = self.scan(&topic, start).await?;
                Ok::<_, LogError>((topic, entries))
            })
            .buffer_unordered(self.max_concurrent_topic_reads)
            .try_collect()
            .await?;

        let total: usize = msgs.values().map(Vec::len).sum();
        ENTRIES_POLLED.inc_by(total as u64);
        Ok(msgs)
    }

    /// Sequential scan of one topic from `start`.
    async fn scan(&self, topic: &str, start: Offset) -> LogResult<Vec<PolledEntry>> {
        let mut entries = Vec::with_capacity(self.poll_window.min(16));
        let mut offset = start;

        while entries.len() < self.poll_window {
            match self.entries.get(topic, offset).await? {
                Some(value) => entries.push((offset, value)),
                None => break,
            }
            offset = offset.next();
        }

        debug!(topic, %start, count = entries.len(), "Topic scanned");
        Ok(entries)
    }
}

/// Handle a poll request.
pub(super) async fn handle_poll<S: CoordinationStore + 'static>(
    service: &LogService<S>,
    ctx: &RequestContext,
    request: PollRequestData,
) -> HandlerResult<PollResponseData> {
    debug!(
        src = %ctx.src,
        topic_count = request.offsets.len(),
        "POLL request received"
    );

    let msgs = service.poll(&request.offsets).await?;
    Ok(PollResponseData { msgs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::config::LogConfig;
    use crate::cluster::MemoryStore;
    use crate::error::ErrorCode;
    use serde_json::{Number, json};
    use std::sync::Arc;

    async fn seeded(values: &[i64]) -> (Arc<MemoryStore>, LogService<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = LogService::new(&LogConfig::default(), store.clone()).unwrap();
        for v in values {
            service.send("a", &Number::from(*v)).await.unwrap();
        }
        (store, service)
    }

    fn request(pairs: &[(&str, u64)]) -> BTreeMap<String, Offset> {
        pairs
            .iter()
            .map(|(t, o)| (t.to_string(), Offset(*o)))
            .collect()
    }

    #[tokio::test]
    async fn test_poll_returns_window_from_start() {
        let (_, service) = seeded(&[10, 20, 30, 40, 50]).await;

        let msgs = service.poll(&request(&[("a", 1)])).await.unwrap();
        let offsets: Vec<u64> = msgs["a"].iter().map(|(o, _)| o.value()).collect();
        assert_eq!(offsets, vec![1, 2, 3]);
        assert_eq!(msgs["a"][0].1, Number::from(20));
    }

    #[tokio::test]
    async fn test_poll_past_end_is_empty() {
        let (_, service) = seeded(&[10, 20]).await;
        let msgs = service.poll(&request(&[("a", 5), ("b", 0)])).await.unwrap();
        assert_eq!(msgs["a"], vec![]);
        assert_eq!(msgs["b"], vec![]);
    }

    #[tokio::test]
    async fn test_poll_stops_at_gap() {
        let (store, service) = seeded(&[10]).await;
        store.write("entry_a_2", json!(30)).await.unwrap();

        let msgs = service.poll(&request(&[("a", 0)])).await.unwrap();
        assert_eq!(msgs["a"], vec![(Offset(0), Number::from(10))]);
    }

    #[tokio::test]
    async fn test_poll_window_is_configurable() {
        let store = Arc::new(MemoryStore::new());
        let config = LogConfig {
            poll_window: 5,
            ..Default::default()
        };
        let service = LogService::new(&config, store).unwrap();
        for v in 0..8 {
            service.send("a", &Number::from(v)).await.unwrap();
        }
        let msgs = service.poll(&request(&[("a", 0)])).await.unwrap();
        assert_eq!(msgs["a"].len(), 5);
    }

    #[tokio::test]
    async fn test_poll_accepts_any_topic_string() {
        let (_, service) = seeded(&[7]).await;
        let long = "t".repeat(300);
        let msgs = service
            .poll(&request(&[("a", 0), ("", 0), (long.as_str(), 0)]))
            .await
            .unwrap();
        assert_eq!(msgs["a"], vec![(Offset(0), Number::from(7))]);
        assert_eq!(msgs[""], vec![]);
        assert_eq!(msgs[&long], vec![]);
    }

    #[tokio::test]
    async fn test_poll_store_error_fails_request() {
        let (store, service) = seeded(&[1]).await;
        store.fail_next(1, ErrorCode::Crash);
        assert!(service.poll(&request(&[("a", 0)])).await.is_err());
    }
}
