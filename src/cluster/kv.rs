//! Coordination store client for a remote KV service node.
//!
//! Speaks the KV service's RPCs over the node transport:
//!
//! | Request | Fields | Reply |
//! |---------|--------|-------|
//! | `read` | `key` | `read_ok {value}` |
//! | `write` | `key, value` | `write_ok` |
//! | `cas` | `key, from, to, create_if_not_exists` | `cas_ok` |
//!
//! Error replies are translated with [`LogError::from_store_reply`], so a
//! missing key surfaces as [`LogError::KeyNotFound`] and a failed CAS
//! precondition as [`LogError::CasConflict`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use super::error::{LogError, LogResult};
use super::metrics::record_store_op;
use super::traits::CoordinationStore;
use crate::error::Error;
use crate::server::{Body, Node};

const READ: &str = "read";
const READ_OK: &str = "read_ok";
const WRITE: &str = "write";
const WRITE_OK: &str = "write_ok";
const CAS: &str = "cas";
const CAS_OK: &str = "cas_ok";

#[derive(Debug, Serialize)]
struct ReadRequest<'a> {
    key: &'a str,
}

#[derive(Debug, Deserialize)]
struct ReadResponse {
    value: Value,
}

#[derive(Debug, Serialize)]
struct WriteRequest<'a> {
    key: &'a str,
    value: Value,
}

#[derive(Debug, Serialize)]
struct CasRequest<'a> {
    key: &'a str,
    from: Value,
    to: Value,
    create_if_not_exists: bool,
}

/// RPC client for a KV service such as `lin-kv`.
#[derive(Debug, Clone)]
pub struct KvClient {
    node: Node,
    service: String,
    timeout: Duration,
}

impl KvClient {
    pub fn new(node: Node, service: impl Into<String>, timeout: Duration) -> Self {
        Self {
            node,
            service: service.into(),
            timeout,
        }
    }

    async fn call<T: Serialize>(
        &self,
        op: &'static str,
        key: &str,
        payload: &T,
        expected: &str,
    ) -> LogResult<Body> {
        let body = Body::encode(op, payload).map_err(LogError::from)?;
        let result = self.node.rpc(&self.service, body, self.timeout).await;
        record_store_op(op, result.is_ok());

        let reply = result.map_err(|e| match e {
            Error::Rpc { code, text } => LogError::from_store_reply(key, code, text),
            other => LogError::from(other),
        })?;

        trace!(service = %self.service, op, key, reply = %reply.kind, "KV reply");

        if reply.kind != expected {
            return Err(LogError::Decode(format!(
                "expected {expected} from {}, got {}",
                self.service, reply.kind
            )));
        }
        Ok(reply)
    }
}

#[async_trait]
impl CoordinationStore for KvClient {
    async fn read(&self, key: &str) -> LogResult<Value> {
        let reply = self.call(READ, key, &ReadRequest { key }, READ_OK).await?;
        let response: ReadResponse = reply.decode().map_err(LogError::from)?;
        Ok(response.value)
    }

    async fn write(&self, key: &str, value: Value) -> LogResult<()> {
        self.call(WRITE, key, &WriteRequest { key, value }, WRITE_OK)
            .await?;
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        from: Value,
        to: Value,
        create_if_absent: bool,
    ) -> LogResult<()> {
        let request = CasRequest {
            key,
            from,
            to,
            create_if_not_exists: create_if_absent,
        };
        self.call(CAS, key, &request, CAS_OK).await?;
        Ok(())
    }
}
