//! Centralized protocol and configuration constants.
//!
//! # Categories
//!
//! - **Protocol Constants**: message types and service names
//! - **Log Constants**: poll window and read fan-out
//! - **Coordination Constants**: CAS retry budget and RPC timeouts

// =============================================================================
// Protocol Constants
// =============================================================================

/// Linearizable key-value service provided by the cluster.
///
/// Offset allocation depends on CAS being linearizable across nodes,
/// so this is the default coordination store.
pub const LIN_KV_SERVICE: &str = "lin-kv";

/// Sequentially consistent key-value service provided by the cluster.
pub const SEQ_KV_SERVICE: &str = "seq-kv";

// =============================================================================
// Log Constants
// =============================================================================

/// Default number of entries returned per topic by a single poll.
pub const DEFAULT_POLL_WINDOW: usize = 3;

/// Default bound on topics scanned in parallel by one poll request.
pub const DEFAULT_MAX_CONCURRENT_TOPIC_READS: usize = 8;

// =============================================================================
// Coordination Constants
// =============================================================================

/// Default number of CAS attempts before a send fails with contention.
pub const DEFAULT_CAS_MAX_ATTEMPTS: u32 = 64;

/// Default minimum backoff between CAS attempts (milliseconds).
pub const DEFAULT_CAS_MIN_BACKOFF_MS: u64 = 1;

/// Default maximum backoff between CAS attempts (milliseconds).
pub const DEFAULT_CAS_MAX_BACKOFF_MS: u64 = 100;

/// Default timeout for an outbound RPC (milliseconds).
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 1_000;

/// Retries for an entry write after its offset has been allocated.
///
/// An allocated offset whose entry is never written is a gap that polls
/// stop at, so transient write failures are retried before giving up.
pub const ENTRY_WRITE_RETRIES: usize = 3;
