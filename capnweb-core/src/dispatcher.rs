use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::RpcError;

/// The user-supplied method dispatcher a session calls into once a
/// call's arguments are fully resolved.
///
/// Implementations may block or suspend; the core never holds a
/// session lock across a `dispatch` call (see DESIGN.md on
/// concurrency). Implementations must be safe to call concurrently —
/// the same target may back many sessions at once.
#[async_trait]
pub trait RpcTarget: Send + Sync {
    async fn dispatch(&self, method: &str, args: JsonValue) -> Result<JsonValue, RpcError>;
}

/// A dispatcher used in tests and docs that echoes back a description
/// of the call it received.
#[derive(Debug, Default)]
pub struct MockRpcTarget;

#[async_trait]
impl RpcTarget for MockRpcTarget {
    async fn dispatch(&self, method: &str, args: JsonValue) -> Result<JsonValue, RpcError> {
        Ok(serde_json::json!({ "method": method, "args": args }))
    }
}
