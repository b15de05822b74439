//! seqlog node binary.
//!
//! Speaks line-delimited JSON on stdin/stdout and keeps all log state in a
//! KV service reachable through the same transport.
//!
//! ## Running
//!
//! Under Maelstrom:
//! ```bash
//! cargo build --release
//! maelstrom test -w kafka --bin target/release/seqlog-node --node-count 2 --concurrency 2n --time-limit 20 --rate 1000
//! ```
//!
//! With JSON logging (stderr):
//! ```bash
//! LOG_FORMAT=json RUST_LOG=debug target/release/seqlog-node
//! ```
//!
//! See [`LogConfig`] for the remaining environment variables.

use std::sync::Arc;

use seqlog::cluster::{KvClient, LogConfig, LogService, metrics};
use seqlog::server::NodeServer;
use seqlog::telemetry::{LogFormat, init_logging};
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout is the protocol channel
    init_logging(LogFormat::from_env()).map_err(|e| -> Box<dyn std::error::Error> { e })?;

    let config = LogConfig::from_env()?;
    if let Err(errors) = config.validate() {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(format!("invalid configuration: {}", errors.join("; ")).into());
    }

    info!(
        kv_service = %config.kv_service,
        poll_window = config.poll_window,
        commit_mode = %config.commit_mode,
        rpc_timeout_ms = config.rpc_timeout.as_millis() as u64,
        "Starting seqlog node"
    );

    let server = NodeServer::stdio();
    let store = KvClient::new(
        server.node(),
        config.kv_service.clone(),
        config.rpc_timeout,
    );
    let service = LogService::new(&config, Arc::new(store))?;

    let result = server.run(Arc::new(service)).await;

    match metrics::encode_metrics() {
        Ok(text) => debug!(metrics = %text, "Final metrics"),
        Err(e) => debug!(error = %e, "Failed to encode metrics"),
    }

    result?;
    Ok(())
}
