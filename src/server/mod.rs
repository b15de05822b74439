//! Node runtime over line-delimited JSON on stdin/stdout.
//!
//! The runtime reads one [`Message`] per line, answers the `init`
//! handshake itself, hands RPC replies to their waiting callers and spawns
//! one task per client request. A single writer task owns the output
//! stream; everything else queues outbound messages through the [`Node`]
//! handle.
//!
//! # Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use seqlog::server::{Handler, HandlerResult, NodeServer, RequestContext};
//! use seqlog::server::request::SendRequestData;
//! use seqlog::server::response::SendResponseData;
//! use seqlog::types::Offset;
//! use async_trait::async_trait;
//!
//! struct MyHandler;
//!
//! #[async_trait]
//! impl Handler for MyHandler {
//!     async fn handle_send(
//!         &self,
//!         _ctx: &RequestContext,
//!         _request: SendRequestData,
//!     ) -> HandlerResult<SendResponseData> {
//!         Ok(SendResponseData { offset: Offset(0) })
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = NodeServer::stdio();
//!     server.run(Arc::new(MyHandler)).await?;
//!     Ok(())
//! }
//! ```

mod dispatch;
mod handler;
pub mod message;
mod node;
pub mod request;
pub mod response;

pub use dispatch::route;
pub use handler::{Handler, HandlerResult, RequestContext};
pub use message::{Body, Message};
pub use node::{Node, NodeIdentity};

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::{Error, ErrorCode, Result};

/// A protocol node bound to an input and an output stream.
pub struct NodeServer<R, W> {
    reader: R,
    writer: W,
    node: Node,
    outbound_rx: mpsc::UnboundedReceiver<Message>,
}

impl NodeServer<BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    /// Node speaking on the process' stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> NodeServer<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(reader: R, writer: W) -> Self {
        let (node, outbound_rx) = Node::new();
        Self {
            reader,
            writer,
            node,
            outbound_rx,
        }
    }

    /// Handle for sending messages and RPCs from this node.
    ///
    /// Available before [`run`](Self::run) so that RPC clients can be
    /// built ahead of the handler that uses them.
    pub fn node(&self) -> Node {
        self.node.clone()
    }

    /// Run until the input stream ends.
    ///
    /// In-flight requests are allowed to finish and every queued reply is
    /// flushed before returning.
    pub async fn run<H: Handler + 'static>(self, handler: Arc<H>) -> Result<()> {
        let NodeServer {
            reader,
            writer,
            node,
            outbound_rx,
        } = self;

        let (drain_tx, drain_rx) = oneshot::channel();
        let writer_task = tokio::spawn(write_loop(writer, outbound_rx, drain_rx));

        let mut requests = JoinSet::new();
        let mut lines = reader.lines();

        let read_result = loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break Ok(()),
                Err(e) => break Err(Error::from(e)),
            };
            if line.trim().is_empty() {
                continue;
            }

            let message = match Message::from_line(&line) {
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, line = %line, "Dropping undecodable message");
                    continue;
                }
            };

            if message.body.in_reply_to.is_some() {
                node.complete(message.body);
                continue;
            }

            if message.body.kind == request::INIT {
                handle_init(&node, message);
                continue;
            }

            if !node.is_initialized() {
                warn!(src = %message.src, kind = %message.body.kind, "Request before init");
                let body = Body::error(ErrorCode::TemporarilyUnavailable, "node not initialized")
                    .with_in_reply_to(message.body.msg_id);
                if let Err(e) = node.send_from(message.dest.clone(), &message.src, body) {
                    warn!(error = %e, "Failed to queue reply");
                }
                continue;
            }

            let handler = Arc::clone(&handler);
            let node = node.clone();
            requests.spawn(async move {
                dispatch::dispatch(handler.as_ref(), &node, message).await;
            });

            // Reap finished tasks so the set does not grow with every request.
            while let Some(joined) = requests.try_join_next() {
                if let Err(e) = joined {
                    error!(error = %e, "Request task panicked");
                }
            }
        };

        debug!(in_flight = requests.len(), "Input closed, draining requests");
        while let Some(joined) = requests.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Request task panicked");
            }
        }

        let _ = drain_tx.send(());
        let write_result = match writer_task.await {
            Ok(result) => result,
            Err(e) => Err(Error::Closed(format!("writer task failed: {e}"))),
        };

        info!("Node stopped");
        read_result.and(write_result)
    }
}

fn handle_init(node: &Node, message: Message) {
    let reply = match message.body.decode::<request::InitRequestData>() {
        Ok(init) => {
            info!(node_id = %init.node_id, nodes = ?init.node_ids, "Node initialized");
            match node.initialize(init.node_id, init.node_ids) {
                Ok(()) => Body::new(response::INIT_OK),
                Err(e) => Body::error(ErrorCode::MalformedRequest, e.to_string()),
            }
        }
        Err(e) => Body::error(ErrorCode::MalformedRequest, e.to_string()),
    };

    let src = node
        .node_id()
        .map(str::to_string)
        .unwrap_or_else(|| message.dest.clone());
    let reply = reply
        .with_msg_id(node.next_msg_id())
        .with_in_reply_to(message.body.msg_id);
    if let Err(e) = node.send_from(src, &message.src, reply) {
        warn!(error = %e, "Failed to queue init reply");
    }
}

async fn write_loop<W>(
    mut writer: W,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    mut drain: oneshot::Receiver<()>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;
            msg = outbound.recv() => match msg {
                Some(msg) => write_message(&mut writer, &msg).await?,
                None => break,
            },
            _ = &mut drain => {
                while let Ok(msg) = outbound.try_recv() {
                    write_message(&mut writer, &msg).await?;
                }
                break;
            }
        }
    }
    writer.flush().await?;
    Ok(())
}

async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, msg: &Message) -> Result<()> {
    let mut line = msg.to_line()?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
