//! Retry policies for coordination store operations.
//!
//! All policies use the `backon` crate with exponential backoff and jitter so
//! that concurrent appenders to the same topic spread out instead of
//! retrying in lockstep.
//!
//! # Available Policies
//!
//! | Policy | Min Delay | Max Delay | Retries | Use Case |
//! |--------|-----------|-----------|---------|----------|
//! | `cas_policy` | configured | configured | attempts - 1 | Offset allocation |
//! | `storage_policy` | 5ms | 200ms | 3 | Entry writes after allocation |
//!
//! # Example
//!
//! ```rust,no_run
//! use seqlog::cluster::retry;
//! use backon::Retryable;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let result = (|| async {
//!         // your fallible operation
//!         Ok::<_, std::io::Error>(())
//!     })
//!     .retry(retry::storage_policy())
//!     .when(|e| e.kind() == std::io::ErrorKind::TimedOut)
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use backon::ExponentialBuilder;

use super::config::CasRetryConfig;
use crate::constants::ENTRY_WRITE_RETRIES;

/// Policy for the offset allocation CAS loop.
///
/// `max_attempts` counts the first attempt, so the policy allows
/// `max_attempts - 1` retries. Delays start at `min_backoff`, double per
/// attempt up to `max_backoff`, and are jittered.
pub fn cas_policy(config: &CasRetryConfig) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(config.min_backoff)
        .with_max_delay(config.max_backoff)
        .with_max_times(config.max_attempts.saturating_sub(1) as usize)
        .with_jitter()
}

/// Policy for writing an entry whose offset is already allocated.
///
/// Characteristics:
/// - Short initial delay (5ms)
/// - Short max delay (200ms) to fail fast if the store is down
/// - Few retries (3)
pub fn storage_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(5))
        .with_max_delay(Duration::from_millis(200))
        .with_max_times(ENTRY_WRITE_RETRIES)
        .with_jitter()
}

/// Record a retry attempt for metrics.
pub fn record_retry_attempt(policy_name: &str, attempt: u32) {
    super::metrics::RETRY_ATTEMPTS
        .with_label_values(&[policy_name, "attempt"])
        .inc();

    tracing::debug!(policy = policy_name, attempt, "Retry attempt");
}

/// Record a retry exhaustion (all retries failed).
pub fn record_retry_exhausted(policy_name: &str) {
    super::metrics::RETRY_ATTEMPTS
        .with_label_values(&[policy_name, "exhausted"])
        .inc();

    tracing::warn!(policy = policy_name, "Retry policy exhausted");
}

/// Record a retry success.
pub fn record_retry_success(policy_name: &str) {
    super::metrics::RETRY_ATTEMPTS
        .with_label_values(&[policy_name, "success"])
        .inc();
}
