//! Request routing from decoded messages to [`Handler`] methods.

use std::time::Instant;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::handler::{Handler, HandlerResult, RequestContext};
use super::message::{Body, Message};
use super::node::Node;
use super::request::*;
use super::response::*;
use crate::cluster::metrics;

fn decode<T: DeserializeOwned>(body: &Body) -> HandlerResult<T> {
    body.decode()
        .map_err(|e| ErrorResponse::malformed(e.to_string()))
}

fn encode<T: Serialize>(kind: &str, result: HandlerResult<T>) -> HandlerResult<Body> {
    let payload = result?;
    Body::encode(kind, &payload).map_err(|e| ErrorResponse::crash(e.to_string()))
}

/// Route one request to `handler` and build the reply body.
///
/// Unknown request types get `not-supported`, bodies that fail to decode get
/// `malformed-request`. Handler failures become `error` bodies.
pub async fn route<H: Handler + ?Sized>(
    handler: &H,
    ctx: &RequestContext,
    body: &Body,
) -> HandlerResult<Body> {
    match body.kind.as_str() {
        SEND => {
            let request = decode::<SendRequestData>(body)?;
            encode(SEND_OK, handler.handle_send(ctx, request).await)
        }
        POLL => {
            let request = decode::<PollRequestData>(body)?;
            encode(POLL_OK, handler.handle_poll(ctx, request).await)
        }
        COMMIT_OFFSETS => {
            let request = decode::<CommitOffsetsRequestData>(body)?;
            encode(
                COMMIT_OFFSETS_OK,
                handler.handle_commit_offsets(ctx, request).await,
            )
        }
        LIST_COMMITTED_OFFSETS => {
            let request = decode::<ListCommittedOffsetsRequestData>(body)?;
            encode(
                LIST_COMMITTED_OFFSETS_OK,
                handler.handle_list_committed_offsets(ctx, request).await,
            )
        }
        other => Err(ErrorResponse::not_supported(other)),
    }
}

fn api_label(kind: &str) -> &'static str {
    match kind {
        SEND => SEND,
        POLL => POLL,
        COMMIT_OFFSETS => COMMIT_OFFSETS,
        LIST_COMMITTED_OFFSETS => LIST_COMMITTED_OFFSETS,
        _ => "unknown",
    }
}

/// Handle one inbound request end to end and queue the reply.
pub(crate) async fn dispatch<H: Handler + ?Sized>(handler: &H, node: &Node, message: Message) {
    let node_id = node.node_id().unwrap_or_default().to_string();
    let ctx = RequestContext::new(node_id, &message);
    let start = Instant::now();

    debug!(
        request_id = %ctx.request_id,
        src = %ctx.src,
        kind = %message.body.kind,
        "Request received"
    );

    let result = route(handler, &ctx, &message.body).await;
    let api = api_label(&message.body.kind);

    let reply = match result {
        Ok(body) => {
            metrics::record_request(api, "ok", start.elapsed().as_secs_f64());
            body
        }
        Err(err) => {
            warn!(
                request_id = %ctx.request_id,
                src = %ctx.src,
                kind = %message.body.kind,
                error = %err,
                "Request failed"
            );
            metrics::record_request(api, "error", start.elapsed().as_secs_f64());
            Body::error(err.code, err.text)
        }
    };

    if let Err(e) = node.reply(&ctx.src, ctx.msg_id, reply) {
        warn!(request_id = %ctx.request_id, error = %e, "Failed to queue reply");
    }
}
