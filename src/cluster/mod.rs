//! Leaderless append-only log over a linearizable key-value store.
//!
//! This module provides the log service and the coordination layer it is
//! built on:
//! - **Offset allocation**: compare-and-swap on a per-topic tail pointer
//! - **Entry storage**: one key per `(topic, offset)` record
//! - **Commit tracking**: node-local or coordination-store backed
//!
//! # Architecture
//!
//! ```text
//!        ┌────────┐   ┌────────┐   ┌────────┐
//!        │ Node 1 │   │ Node 2 │   │ Node 3 │   ← LogService, no leader
//!        └───┬────┘   └───┬────┘   └───┬────┘
//!            │            │            │
//!            └────────────┼────────────┘
//!                         ▼
//!                  ┌─────────────┐
//!                  │   lin-kv    │ ← tail_<t>, entry_<t>_<n>, commit_<t>
//!                  └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use seqlog::cluster::{KvClient, LogConfig, LogService};
//! use seqlog::server::NodeServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LogConfig::from_env()?;
//!     let server = NodeServer::stdio();
//!     let store = KvClient::new(server.node(), config.kv_service.clone(), config.rpc_timeout);
//!     let service = LogService::new(&config, Arc::new(store))?;
//!     server.run(Arc::new(service)).await?;
//!     Ok(())
//! }
//! ```

mod commit_tracker;
mod config;
mod entry_store;
mod error;
mod handler;
mod keys;
mod kv;
mod memory_store;
pub mod metrics;
mod offset_allocator;
pub mod retry;
mod traits;

pub use commit_tracker::{LocalCommitTracker, StoreCommitTracker};
pub use config::{CasRetryConfig, CommitMode, LogConfig};
pub use entry_store::EntryStore;
pub use error::{LogError, LogResult};
pub use handler::LogService;
pub use keys::{commit_key, entry_key, tail_key};
pub use kv::KvClient;
pub use memory_store::{MemoryStore, StoreOp};
pub use offset_allocator::OffsetAllocator;
pub use traits::{CommitTracker, CoordinationStore};
