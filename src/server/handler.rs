//! Handler trait for processing client requests.
//!
//! Implement the `Handler` trait to provide custom logic for each request
//! type. Default implementations reply `not-supported`, so a handler only
//! overrides the requests it serves.

use async_trait::async_trait;

use super::message::Message;
use super::request::*;
use super::response::*;
use crate::types::MsgId;

/// Result of handling one request: a typed reply or an error reply.
pub type HandlerResult<T> = std::result::Result<T, ErrorResponse>;

/// Context for a request, containing envelope information.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// This node's id.
    pub node_id: String,
    /// The client that sent the request.
    pub src: String,
    /// The request's `msg_id`, echoed as `in_reply_to`.
    pub msg_id: Option<MsgId>,
    /// Unique request ID for correlation across logs.
    pub request_id: uuid::Uuid,
}

impl RequestContext {
    pub fn new(node_id: impl Into<String>, message: &Message) -> Self {
        Self {
            node_id: node_id.into(),
            src: message.src.clone(),
            msg_id: message.body.msg_id,
            request_id: uuid::Uuid::new_v4(),
        }
    }

    /// Get the request ID for logging.
    pub fn request_id(&self) -> &uuid::Uuid {
        &self.request_id
    }
}

/// Trait for handling log requests.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handle a send request.
    async fn handle_send(
        &self,
        _ctx: &RequestContext,
        _request: SendRequestData,
    ) -> HandlerResult<SendResponseData> {
        Err(ErrorResponse::not_supported(SEND))
    }

    /// Handle a poll request.
    async fn handle_poll(
        &self,
        _ctx: &RequestContext,
        _request: PollRequestData,
    ) -> HandlerResult<PollResponseData> {
        Err(ErrorResponse::not_supported(POLL))
    }

    /// Handle a commit_offsets request.
    async fn handle_commit_offsets(
        &self,
        _ctx: &RequestContext,
        _request: CommitOffsetsRequestData,
    ) -> HandlerResult<CommitOffsetsResponseData> {
        Err(ErrorResponse::not_supported(COMMIT_OFFSETS))
    }

    /// Handle a list_committed_offsets request.
    async fn handle_list_committed_offsets(
        &self,
        _ctx: &RequestContext,
        _request: ListCommittedOffsetsRequestData,
    ) -> HandlerResult<ListCommittedOffsetsResponseData> {
        Err(ErrorResponse::not_supported(LIST_COMMITTED_OFFSETS))
    }
}
