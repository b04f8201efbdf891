//! `SessionEngine`: the per-session message dispatcher that drives
//! `SessionStore` and `PipelineResolver` and builds responses (spec §4.4).

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::dispatcher::RpcTarget;
use crate::error::RpcError;
use crate::ids::ExportId;
use crate::message::{self, Message, MessageError, Response};
use crate::pipeline;
use crate::session::SessionState;
use crate::value::Value;

/// A failure parsing the raw line itself, before it became a `Message`.
/// Per spec §7, these are not per-export rejects: the transport logs and
/// drops the line.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid message: {0}")]
    Message(#[from] MessageError),
}

/// One RPC session: owns a `SessionState` and processes inbound lines one
/// at a time (spec §5: a session's messages are handled to completion in
/// arrival order).
pub struct Session {
    state: Arc<SessionState>,
}

impl Session {
    pub fn new(target: Arc<dyn RpcTarget>) -> Self {
        Self {
            state: Arc::new(SessionState::new(target)),
        }
    }

    /// Parse and handle one wire line. Returns the single outbound
    /// message to send back, if any.
    pub async fn handle_line(&self, line: &str) -> Result<Option<String>, SessionError> {
        let json: JsonValue = serde_json::from_str(line)?;
        let message = message::parse_message(&json)?;
        let Some(message) = message else {
            debug!("ignoring message with unknown tag or malformed known-tag payload");
            return Ok(None);
        };
        let response = self.handle_message(message).await;
        Ok(response.map(|r| r.to_wire_string().expect("response always serializes")))
    }

    async fn handle_message(&self, message: Message) -> Option<Response> {
        match message {
            Message::Push(None) => {
                debug!("dropping push with unrecognized body");
                None
            }
            Message::Push(Some(call)) => {
                self.push(call);
                None
            }
            Message::Pull(id) => Some(self.pull(ExportId(id)).await),
            Message::Release(id, refcount) => {
                self.release(id, refcount);
                None
            }
            Message::Abort(info) => {
                self.abort(info);
                None
            }
        }
    }

    fn push(&self, call: crate::message::PendingCall) -> ExportId {
        let id = self.state.allocate_id();
        debug!(export_id = %id, method = %call.method, "push");
        self.state.register_pending(id, call);
        id
    }

    async fn pull(&self, id: ExportId) -> Response {
        if let Some(value) = self.state.take_result(id) {
            return Self::response_for(id, value);
        }

        let Some(call) = self.state.take_pending(id) else {
            return Response::Reject(
                id.0,
                RpcError::export_not_found("Export ID not found").to_wire_value(),
            );
        };

        match pipeline::resolve_call(&call, &self.state).await {
            Ok(value) => {
                self.state.store_result(id, value.clone());
                Self::response_for(id, value)
            }
            Err(err) => {
                // Per spec §4.4/§9: a dispatcher (or arg-resolution)
                // failure is not cached. The id becomes unknown; a
                // repeated pull of it yields ExportNotFound.
                Response::Reject(id.0, err.to_wire_value())
            }
        }
    }

    fn release(&self, id: i64, refcount: i64) {
        let total = self.state.record_release();
        debug!(export_id = id, refcount, total, "release (advisory, no state change)");
    }

    fn abort(&self, info: JsonValue) {
        let total = self.state.record_abort();
        warn!(?info, total, "abort (advisory, session continues)");
    }

    /// Build the resolve/reject for a fully-resolved value, applying the
    /// array-escaping rule and the error-triple-as-reject rule (spec §4.1).
    fn response_for(id: ExportId, value: Value) -> Response {
        if let Some((kind, msg)) = value.as_error_triple() {
            return Response::Reject(id.0, serde_json::json!(["error", kind, msg]));
        }
        match value.into_json() {
            Ok(json) => Response::Resolve(id.0, message::wrap_resolved_value(json)),
            Err(err) => Response::Reject(id.0, err.to_wire_value()),
        }
    }
}
