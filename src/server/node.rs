//! Node handle: identity, outbound messages and RPC correlation.
//!
//! A [`Node`] is cheap to clone and shared by the runtime loop, every
//! request task and every RPC client (such as the coordination store
//! client). Outbound messages go through an unbounded channel to the single
//! writer task that owns stdout.
//!
//! # RPC Correlation
//!
//! [`Node::rpc`] stamps a fresh `msg_id` on the outgoing body, parks a
//! oneshot sender under that id and waits for the reply. The runtime loop
//! hands every inbound body carrying `in_reply_to` to [`Node::complete`],
//! which wakes the waiting caller. A reply that arrives after its caller
//! timed out finds no waiter and is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

use super::message::{Body, Message};
use crate::error::{Error, Result};
use crate::types::MsgId;

/// Identity assigned by the `init` handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub node_id: String,
    pub node_ids: Vec<String>,
}

#[derive(Debug)]
struct NodeInner {
    identity: OnceCell<NodeIdentity>,
    next_msg_id: AtomicU64,
    pending: DashMap<MsgId, oneshot::Sender<Body>>,
    outbound: mpsc::UnboundedSender<Message>,
}

/// Shared handle to this node's transport.
#[derive(Debug, Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    /// Create a node and the receiving end of its outbound channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let node = Self {
            inner: Arc::new(NodeInner {
                identity: OnceCell::new(),
                next_msg_id: AtomicU64::new(1),
                pending: DashMap::new(),
                outbound: tx,
            }),
        };
        (node, rx)
    }

    /// Record the identity from `init`. A second `init` is rejected.
    pub fn initialize(&self, node_id: String, node_ids: Vec<String>) -> Result<()> {
        self.inner
            .identity
            .set(NodeIdentity { node_id, node_ids })
            .map_err(|rejected| {
                Error::ParsingError(format!(
                    "node already initialized, ignoring init for {}",
                    rejected.node_id
                ))
            })
    }

    /// This node's id, once initialized.
    pub fn node_id(&self) -> Option<&str> {
        self.inner.identity.get().map(|id| id.node_id.as_str())
    }

    /// All cluster members, once initialized.
    pub fn node_ids(&self) -> &[String] {
        self.inner
            .identity
            .get()
            .map(|id| id.node_ids.as_slice())
            .unwrap_or_default()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.identity.get().is_some()
    }

    fn require_node_id(&self) -> Result<String> {
        self.node_id()
            .map(str::to_string)
            .ok_or_else(|| Error::NotInitialized("no init message received yet".to_string()))
    }

    /// Allocate a message id, unique for the lifetime of this node.
    pub fn next_msg_id(&self) -> MsgId {
        MsgId(self.inner.next_msg_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Queue `body` for `dest` with an explicit source id.
    pub(crate) fn send_from(&self, src: String, dest: &str, body: Body) -> Result<()> {
        self.inner
            .outbound
            .send(Message {
                src,
                dest: dest.to_string(),
                body,
            })
            .map_err(|_| Error::Closed("outbound channel closed".to_string()))
    }

    /// Queue `body` for `dest`. Fails before `init`.
    pub fn send(&self, dest: &str, body: Body) -> Result<()> {
        let src = self.require_node_id()?;
        self.send_from(src, dest, body)
    }

    /// Send `body` as the reply to message `in_reply_to` from `dest`.
    pub fn reply(&self, dest: &str, in_reply_to: Option<MsgId>, body: Body) -> Result<()> {
        let body = body
            .with_msg_id(self.next_msg_id())
            .with_in_reply_to(in_reply_to);
        self.send(dest, body)
    }

    /// Send `body` to `dest` and wait up to `timeout` for the reply.
    ///
    /// An `error` reply is returned as [`Error::Rpc`].
    pub async fn rpc(&self, dest: &str, body: Body, timeout: Duration) -> Result<Body> {
        let msg_id = self.next_msg_id();
        let (tx, rx) = oneshot::channel();
        self.inner.pending.insert(msg_id, tx);

        if let Err(e) = self.send(dest, body.with_msg_id(msg_id)) {
            self.inner.pending.remove(&msg_id);
            return Err(e);
        }

        trace!(dest, %msg_id, "RPC sent");

        let reply = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => {
                return Err(Error::Closed(format!("RPC {msg_id} to {dest} abandoned")));
            }
            Err(_) => {
                self.inner.pending.remove(&msg_id);
                debug!(dest, %msg_id, timeout_ms = timeout.as_millis() as u64, "RPC timed out");
                return Err(Error::Timeout {
                    dest: dest.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        };

        match reply.as_error() {
            Some((code, text)) => Err(Error::Rpc { code, text }),
            None => Ok(reply),
        }
    }

    /// Deliver a reply to its waiting RPC. Returns false if nobody waits.
    pub fn complete(&self, body: Body) -> bool {
        let Some(in_reply_to) = body.in_reply_to else {
            return false;
        };
        match self.inner.pending.remove(&in_reply_to) {
            Some((_, waiter)) => waiter.send(body).is_ok(),
            None => {
                debug!(%in_reply_to, kind = %body.kind, "Dropping reply with no waiting RPC");
                false
            }
        }
    }

    /// RPCs currently waiting for a reply.
    pub fn pending_rpcs(&self) -> usize {
        self.inner.pending.len()
    }
}
