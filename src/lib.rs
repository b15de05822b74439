//! # seqlog
//! Leaderless, append-only, Kafka-style log service over a linearizable
//! key-value store.
//!
//! Producers append numbers to named logs ("topics") and get back a dense,
//! per-topic offset. Consumers poll bounded windows of entries and record
//! committed progress. Any number of nodes can serve the same topics at
//! once: offsets are allocated with compare-and-swap on a shared store, so
//! no node is a leader.
//!
//! # Goals
//! - Easy to understand code
//! - Leverage best in class libraries such as [Tokio](https://tokio.rs/) and [Serde](https://serde.rs/)
//! - Offsets that are unique and gap-free under any concurrency
//!
//! ## Running a node
//! The [`NodeServer`](server::NodeServer) speaks line-delimited JSON on
//! stdin/stdout. [`LogService`](cluster::LogService) implements the
//! [`Handler`](server::Handler) trait over any
//! [`CoordinationStore`](cluster::CoordinationStore), such as the
//! [`KvClient`](cluster::KvClient) for a remote `lin-kv` service.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use seqlog::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let config = LogConfig::from_env()?;
//!     let server = server::NodeServer::stdio();
//!     let store = KvClient::new(server.node(), config.kv_service.clone(), config.rpc_timeout);
//!     let service = LogService::new(&config, Arc::new(store))?;
//!     server.run(Arc::new(service)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Wire protocol
//!
//! | Request | Fields | Reply | Fields |
//! |---|---|---|---|
//! | `send` | `key, msg` | `send_ok` | `offset` |
//! | `poll` | `offsets` | `poll_ok` | `msgs` |
//! | `commit_offsets` | `offsets` | `commit_offsets_ok` | |
//! | `list_committed_offsets` | `keys` | `list_committed_offsets_ok` | `offsets` |

#![forbid(unsafe_code)]

pub mod error;
pub mod server;
pub mod types;

pub mod cluster;
pub mod constants;
pub mod telemetry;

pub mod prelude {
    //! Main export of node and log service structures
    //!
    //! # Server
    //!
    //! Use [`NodeServer`](server::NodeServer) to run a node and implement
    //! the [`Handler`](server::Handler) trait to define its behavior, or use
    //! the ready-made [`LogService`].
    pub use crate::cluster::{
        CommitMode, CommitTracker, CoordinationStore, KvClient, LogConfig, LogError, LogResult,
        LogService, MemoryStore,
    };
    pub use crate::error::{Error, ErrorCode, Result};
    pub use crate::types::{MsgId, Offset};

    pub mod server {
        //! Line-delimited JSON node runtime.
        //!
        //! See [`NodeServer`] for the main entry point.
        pub use crate::server::*;
    }
}
