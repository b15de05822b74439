//! Send request handling.

use serde_json::Number;
use tracing::{debug, warn};

use crate::server::{HandlerResult, RequestContext};
use crate::server::request::SendRequestData;
use crate::server::response::SendResponseData;
use crate::types::Offset;

use super::LogService;
use crate::cluster::error::LogResult;
use crate::cluster::metrics::ENTRIES_APPENDED;
use crate::cluster::traits::CoordinationStore;

impl<S: CoordinationStore + 'static> LogService<S> {
    /// Append `value` to `topic` and return its offset.
    ///
    /// The offset is allocated first, then the entry is written under it.
    /// If the write fails after allocation, the offset stays allocated with
    /// no entry behind it. That gap is permanent: a poll starting at or
    /// below it returns nothing past it, so consumers must skip over the
    /// missing offset themselves to see later entries.
    pub async fn send(&self, topic: &str, value: &Number) -> LogResult<Offset> {
        let offset = self.allocator.allocate(topic).await?;

        if let Err(e) = self.entries.put(topic, offset, value).await {
            warn!(
                topic,
                %offset,
                error = %e,
                "Entry write failed after offset allocation, offset left empty"
            );
            return Err(e);
        }

        ENTRIES_APPENDED.inc();
        Ok(offset)
    }
}

/// Handle a send request.
pub(super) async fn handle_send<S: CoordinationStore + 'static>(
    service: &LogService<S>,
    ctx: &RequestContext,
    request: SendRequestData,
) -> HandlerResult<SendResponseData> {
    debug!(
        src = %ctx.src,
        topic = %request.key,
        value = %request.msg,
        "SEND request received"
    );

    let offset = service.send(&request.key, &request.msg).await?;
    Ok(SendResponseData { offset })
}
