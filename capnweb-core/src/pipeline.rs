//! The resolver: turns a value tree containing `PipelineRef` nodes into a
//! fully-resolved value tree, evaluating and caching dependencies on
//! demand (spec §4.3).

use std::future::Future;
use std::pin::Pin;

use crate::error::RpcError;
use crate::ids::ExportId;
use crate::session::SessionState;
use crate::value::Value;

/// Resolve one export id to a value, evaluating its pending call if it
/// has not run yet, or returning the cached result if it has.
///
/// A dispatcher failure surfaces here under whichever `ErrorKind` the
/// dispatcher itself raised it with (e.g. `ArgumentError` for bad input,
/// `MethodError` for anything else) — this is the "direct" resolution
/// contract `pull` relies on (spec §4.4). Callers that reach an export id
/// indirectly, via a `PipelineRef` nested in another call's arguments,
/// are responsible for re-wrapping any error this returns as
/// `PipelineError` (spec §4.3 step c); this function does not know
/// whether it was invoked directly or indirectly and must not guess.
pub fn resolve_export<'a>(
    id: ExportId,
    session: &'a SessionState,
) -> Pin<Box<dyn Future<Output = Result<Value, RpcError>> + Send + 'a>> {
    Box::pin(async move {
        if session.is_resolving(id) {
            return Err(RpcError::pipeline_error(format!(
                "cycle detected while resolving export {id}"
            )));
        }

        if let Some(cached) = session.peek_result(id) {
            return Ok(cached);
        }

        let Some(call) = session.take_pending(id) else {
            return Err(RpcError::export_not_found(format!(
                "export {id} has no pending call or cached result"
            )));
        };

        // `is_resolving` was just checked false, so this always succeeds.
        session.begin_resolving(id);
        let result = resolve_call(&call, session).await;
        session.end_resolving(id);

        let value = result?;
        session.store_result(id, value.clone());
        Ok(value)
    })
}

/// Resolve a call's args and dispatch it. Shared by `resolve_export`
/// (nested references) and `SessionEngine::pull` (the top-level case) so
/// both go through identical args-resolution-then-dispatch semantics;
/// callers differ only in how they wrap a resulting error.
///
/// A dispatcher's `Err` is passed through unchanged rather than
/// relabeled: the dispatcher is in the best position to know whether a
/// failure was bad input (`ArgumentError`) or something else
/// (`MethodError`), and collapsing every dispatcher error into
/// `MethodError` here would make `ArgumentError` unreachable on the wire.
pub(crate) async fn resolve_call(
    call: &crate::message::PendingCall,
    session: &SessionState,
) -> Result<Value, RpcError> {
    let resolved_args = resolve_value(&call.args, session).await?;
    let json_args = resolved_args.into_json()?;
    let json_result = session.target().dispatch(&call.method, json_args).await?;
    Ok(Value::from_json(&json_result))
}

/// Recursively resolve every `PipelineRef` found within `value`,
/// evaluating dependencies as needed and walking each reference's path.
///
/// A direct `PipelineRef` at the top of `value` has its own resolution
/// failure wrapped as `PipelineError`, per spec §4.3. Errors surfacing
/// from *within* a list or map element are already `PipelineError` (or
/// another kind originating deeper in the tree) by the time they reach
/// here and are propagated unchanged.
pub fn resolve_value<'a>(
    value: &'a Value,
    session: &'a SessionState,
) -> Pin<Box<dyn Future<Output = Result<Value, RpcError>> + Send + 'a>> {
    Box::pin(async move {
        match value {
            Value::PipelineRef { id, path } => {
                let resolved = resolve_export(*id, session)
                    .await
                    .map_err(|e| RpcError::pipeline_error(e.message))?;
                resolved.walk_path(path)
            }
            Value::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(resolve_value(item, session).await?);
                }
                Ok(Value::List(out))
            }
            Value::Map(map) => {
                let mut out = indexmap::IndexMap::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), resolve_value(v, session).await?);
                }
                Ok(Value::Map(out))
            }
            scalar => Ok(scalar.clone()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::MockRpcTarget;
    use crate::error::ErrorKind;
    use crate::message::PendingCall;
    use serde_json::json;
    use std::sync::Arc;

    fn session() -> SessionState {
        SessionState::new(Arc::new(MockRpcTarget))
    }

    #[tokio::test]
    async fn resolves_direct_dependency() {
        let s = session();
        let id = s.allocate_id();
        s.register_pending(
            id,
            PendingCall {
                method: "hello".into(),
                args: Value::from_json(&json!(["World"])),
            },
        );

        let value = resolve_export(id, &s).await.unwrap();
        assert_eq!(
            value,
            Value::from_json(&json!({"method": "hello", "args": ["World"]}))
        );
        // result is now cached
        assert!(s.has_result(id));
    }

    #[tokio::test]
    async fn diamond_dependency_evaluates_once() {
        let s = session();
        let base = s.allocate_id();
        s.register_pending(
            base,
            PendingCall {
                method: "base".into(),
                args: Value::empty_list(),
            },
        );

        let left = s.allocate_id();
        s.register_pending(
            left,
            PendingCall {
                method: "left".into(),
                args: Value::List(vec![Value::PipelineRef { id: base, path: vec![] }]),
            },
        );
        let right = s.allocate_id();
        s.register_pending(
            right,
            PendingCall {
                method: "right".into(),
                args: Value::List(vec![Value::PipelineRef { id: base, path: vec![] }]),
            },
        );

        resolve_export(left, &s).await.unwrap();
        resolve_export(right, &s).await.unwrap();
        // base was consumed as pending exactly once and is now a cached result
        assert!(s.has_result(base));
        assert!(!s.has_pending(base));
    }

    #[tokio::test]
    async fn unknown_export_is_not_found() {
        let s = session();
        let err = resolve_export(ExportId(99), &s).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExportNotFound);
    }

    #[tokio::test]
    async fn nested_failure_wraps_as_pipeline_error() {
        let s = session();
        // export 1 is referenced but never pushed -> ExportNotFound deep down
        let top = s.allocate_id();
        s.register_pending(
            top,
            PendingCall {
                method: "useIt".into(),
                args: Value::List(vec![Value::PipelineRef {
                    id: ExportId(777),
                    path: vec![],
                }]),
            },
        );

        let err = resolve_export(top, &s).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PipelineError);
    }

    #[tokio::test]
    async fn self_reference_is_a_cycle() {
        let s = session();
        let id = s.allocate_id();
        s.register_pending(
            id,
            PendingCall {
                method: "loop".into(),
                args: Value::List(vec![Value::PipelineRef { id, path: vec![] }]),
            },
        );
        let err = resolve_export(id, &s).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PipelineError);
    }

    struct RejectingTarget;

    #[async_trait::async_trait]
    impl crate::dispatcher::RpcTarget for RejectingTarget {
        async fn dispatch(&self, _method: &str, _args: serde_json::Value) -> Result<serde_json::Value, RpcError> {
            Err(RpcError::argument_error("missing required field"))
        }
    }

    #[tokio::test]
    async fn direct_dispatcher_argument_error_keeps_its_kind() {
        let s = SessionState::new(Arc::new(RejectingTarget));
        let id = s.allocate_id();
        s.register_pending(
            id,
            PendingCall {
                method: "doIt".into(),
                args: Value::empty_list(),
            },
        );
        let err = resolve_call(&s.take_pending(id).unwrap(), &s).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ArgumentError);
    }

    #[tokio::test]
    async fn nested_dispatcher_argument_error_is_wrapped_as_pipeline_error() {
        let s = SessionState::new(Arc::new(RejectingTarget));
        let dep = s.allocate_id();
        s.register_pending(
            dep,
            PendingCall {
                method: "doIt".into(),
                args: Value::empty_list(),
            },
        );
        let top = s.allocate_id();
        s.register_pending(
            top,
            PendingCall {
                method: "useIt".into(),
                args: Value::List(vec![Value::PipelineRef { id: dep, path: vec![] }]),
            },
        );
        let err = resolve_export(top, &s).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PipelineError);
    }
}
