//! Leaderless offset allocation.
//!
//! Each topic has a tail pointer in the coordination store holding the
//! number of offsets ever allocated. Allocating reads the tail `n` and
//! swaps it to `n + 1`; whoever wins the swap owns offset `n`. Losers
//! re-read and try again after a jittered backoff.
//!
//! Because the swap is linearizable across every node, two callers can
//! never both win the same `n`, and every `n` below the tail was handed to
//! exactly one caller. Offsets are therefore unique and dense per topic
//! without any leader.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use backon::Retryable;
use serde_json::Value;
use tracing::{debug, warn};

use super::config::CasRetryConfig;
use super::error::{LogError, LogResult};
use super::keys::tail_key;
use super::metrics::CAS_CONFLICTS;
use super::retry::{cas_policy, record_retry_attempt, record_retry_exhausted, record_retry_success};
use super::traits::CoordinationStore;
use crate::types::Offset;

const POLICY_NAME: &str = "cas";

/// Allocates offsets through compare-and-swap on per-topic tail pointers.
pub struct OffsetAllocator<S: CoordinationStore> {
    store: Arc<S>,
    retry: CasRetryConfig,
}

impl<S: CoordinationStore> OffsetAllocator<S> {
    pub fn new(store: Arc<S>, retry: CasRetryConfig) -> Self {
        Self { store, retry }
    }

    /// Assign the next offset of `topic` to this caller.
    ///
    /// # Errors
    /// - [`LogError::ContentionExceeded`] if every attempt lost its race
    /// - Any other store error is returned as soon as it happens
    pub async fn allocate(&self, topic: &str) -> LogResult<Offset> {
        let key = tail_key(topic);
        let key = key.as_str();
        let attempts = AtomicU32::new(0);
        let counter = &attempts;

        let result = (|| async move {
            counter.fetch_add(1, Ordering::Relaxed);
            let outcome = self.try_allocate(key).await;
            if matches!(&outcome, Err(e) if e.is_cas_conflict()) {
                CAS_CONFLICTS.inc();
            }
            outcome
        })
        .retry(cas_policy(&self.retry))
        .when(LogError::is_cas_conflict)
        .notify(|_, delay| {
            record_retry_attempt(POLICY_NAME, counter.load(Ordering::Relaxed));
            debug!(topic, delay_ms = delay.as_millis() as u64, "Tail CAS lost, retrying");
        })
        .await;

        let attempts = attempts.load(Ordering::Relaxed);
        match result {
            Ok(offset) => {
                if attempts > 1 {
                    record_retry_success(POLICY_NAME);
                }
                debug!(topic, %offset, attempts, "Offset allocated");
                Ok(offset)
            }
            Err(e) if e.is_cas_conflict() => {
                record_retry_exhausted(POLICY_NAME);
                warn!(topic, attempts, "Offset allocation gave up under contention");
                Err(LogError::ContentionExceeded {
                    topic: topic.to_string(),
                    attempts,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// One read-then-swap round.
    async fn try_allocate(&self, key: &str) -> LogResult<Offset> {
        let (current, create_if_absent) = match self.store.read_u64(key).await? {
            Some(current) => (current, false),
            None => (0, true),
        };

        let next = current.checked_add(1).ok_or_else(|| LogError::CorruptValue {
            key: key.to_string(),
            reason: "tail pointer overflow".to_string(),
        })?;

        self.store
            .compare_and_swap(key, Value::from(current), Value::from(next), create_if_absent)
            .await?;

        Ok(Offset(current))
    }
}
