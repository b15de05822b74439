//! Configuration for a log service node.
//!
//! # Environment Variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `KV_SERVICE` | `lin-kv` | Node id of the coordination store service |
//! | `POLL_WINDOW` | `3` | Max entries per topic returned by one poll |
//! | `COMMIT_MODE` | `store` | `local` or `store` commit tracking |
//! | `CAS_MAX_ATTEMPTS` | `64` | CAS attempts before a send fails with contention |
//! | `CAS_MIN_BACKOFF_MS` | `1` | First backoff between CAS attempts |
//! | `CAS_MAX_BACKOFF_MS` | `100` | Backoff ceiling between CAS attempts |
//! | `RPC_TIMEOUT_MS` | `1000` | Timeout for each coordination store RPC |
//! | `MAX_CONCURRENT_TOPIC_READS` | `8` | Topics scanned in parallel per poll |

use std::time::Duration;

use crate::constants::{
    DEFAULT_CAS_MAX_ATTEMPTS, DEFAULT_CAS_MAX_BACKOFF_MS, DEFAULT_CAS_MIN_BACKOFF_MS,
    DEFAULT_MAX_CONCURRENT_TOPIC_READS, DEFAULT_POLL_WINDOW, DEFAULT_RPC_TIMEOUT_MS,
    LIN_KV_SERVICE,
};

/// Where committed consumer offsets are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitMode {
    /// In-process map guarded by a mutex. Fast, but each node only sees
    /// commits it received itself.
    Local,
    /// Coordination store backed. Every node observes every commit.
    #[default]
    Store,
}

impl std::fmt::Display for CommitMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitMode::Local => write!(f, "local"),
            CommitMode::Store => write!(f, "store"),
        }
    }
}

impl std::str::FromStr for CommitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "memory" => Ok(CommitMode::Local),
            "store" | "kv" => Ok(CommitMode::Store),
            _ => Err(format!(
                "Unknown commit mode '{}'. Valid modes: local, store",
                s
            )),
        }
    }
}

/// Retry budget for the offset allocation CAS loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasRetryConfig {
    /// Total CAS attempts, including the first, before giving up.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub min_backoff: Duration,
    /// Upper bound on the delay between retries.
    pub max_backoff: Duration,
}

impl Default for CasRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_CAS_MAX_ATTEMPTS,
            min_backoff: Duration::from_millis(DEFAULT_CAS_MIN_BACKOFF_MS),
            max_backoff: Duration::from_millis(DEFAULT_CAS_MAX_BACKOFF_MS),
        }
    }
}

/// Configuration for a log service node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Node id of the coordination store service RPCs are sent to.
    pub kv_service: String,

    /// Maximum entries returned per topic by one poll.
    pub poll_window: usize,

    /// Commit tracking strategy.
    pub commit_mode: CommitMode,

    /// Offset allocation retry budget.
    pub cas_retry: CasRetryConfig,

    /// Timeout for each outbound RPC.
    pub rpc_timeout: Duration,

    /// Bound on topics scanned in parallel by one poll.
    pub max_concurrent_topic_reads: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            kv_service: LIN_KV_SERVICE.to_string(),
            poll_window: DEFAULT_POLL_WINDOW,
            commit_mode: CommitMode::default(),
            cas_retry: CasRetryConfig::default(),
            rpc_timeout: Duration::from_millis(DEFAULT_RPC_TIMEOUT_MS),
            max_concurrent_topic_reads: DEFAULT_MAX_CONCURRENT_TOPIC_READS,
        }
    }
}

impl LogConfig {
    /// Validate the configuration and return any errors found.
    ///
    /// This should be called at startup to catch configuration issues early.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.kv_service.trim().is_empty() {
            errors.push("kv_service must not be empty".to_string());
        }

        if self.poll_window == 0 {
            errors.push("poll_window must be at least 1".to_string());
        }

        if self.cas_retry.max_attempts == 0 {
            errors.push("cas_retry.max_attempts must be at least 1".to_string());
        }

        if self.cas_retry.min_backoff > self.cas_retry.max_backoff {
            errors.push(format!(
                "cas_retry.min_backoff ({:?}) must not exceed cas_retry.max_backoff ({:?})",
                self.cas_retry.min_backoff, self.cas_retry.max_backoff
            ));
        }

        if self.rpc_timeout.is_zero() {
            errors.push("rpc_timeout must be greater than 0".to_string());
        }

        if self.max_concurrent_topic_reads == 0 {
            errors.push("max_concurrent_topic_reads must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Unset variables fall back to [`LogConfig::default`]. Set but
    /// unparsable variables are errors.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let defaults = Self::default();

        let kv_service = std::env::var("KV_SERVICE").unwrap_or(defaults.kv_service);

        let poll_window = parse_env("POLL_WINDOW", defaults.poll_window)?;

        let commit_mode = match std::env::var("COMMIT_MODE") {
            Ok(s) => s.parse::<CommitMode>()?,
            Err(_) => defaults.commit_mode,
        };

        let max_attempts = parse_env("CAS_MAX_ATTEMPTS", defaults.cas_retry.max_attempts)?;
        let min_backoff_ms = parse_env(
            "CAS_MIN_BACKOFF_MS",
            defaults.cas_retry.min_backoff.as_millis() as u64,
        )?;
        let max_backoff_ms = parse_env(
            "CAS_MAX_BACKOFF_MS",
            defaults.cas_retry.max_backoff.as_millis() as u64,
        )?;

        let rpc_timeout_ms = parse_env("RPC_TIMEOUT_MS", defaults.rpc_timeout.as_millis() as u64)?;

        let max_concurrent_topic_reads = parse_env(
            "MAX_CONCURRENT_TOPIC_READS",
            defaults.max_concurrent_topic_reads,
        )?;

        Ok(Self {
            kv_service,
            poll_window,
            commit_mode,
            cas_retry: CasRetryConfig {
                max_attempts,
                min_backoff: Duration::from_millis(min_backoff_ms),
                max_backoff: Duration::from_millis(max_backoff_ms),
            },
            rpc_timeout: Duration::from_millis(rpc_timeout_ms),
            max_concurrent_topic_reads,
        })
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("Invalid {}: {}", name, e).into()),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = LogConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_window, 3);
        assert_eq!(config.kv_service, "lin-kv");
        assert_eq!(config.commit_mode, CommitMode::Store);
    }

    #[test]
    fn test_validate_zero_poll_window_fails() {
        let config = LogConfig {
            poll_window: 0,
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("poll_window")));
    }

    #[test]
    fn test_validate_backoff_order() {
        let config = LogConfig {
            cas_retry: CasRetryConfig {
                max_attempts: 3,
                min_backoff: Duration::from_millis(50),
                max_backoff: Duration::from_millis(10),
            },
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("min_backoff")));
    }

    #[test]
    fn test_validate_multiple_errors() {
        let config = LogConfig {
            kv_service: " ".to_string(),
            poll_window: 0,
            cas_retry: CasRetryConfig {
                max_attempts: 0,
                ..Default::default()
            },
            rpc_timeout: Duration::ZERO,
            max_concurrent_topic_reads: 0,
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn test_commit_mode_parsing() {
        assert_eq!("local".parse::<CommitMode>(), Ok(CommitMode::Local));
        assert_eq!("STORE".parse::<CommitMode>(), Ok(CommitMode::Store));
        assert!("nope".parse::<CommitMode>().is_err());
        assert_eq!(CommitMode::Local.to_string(), "local");
    }
}
