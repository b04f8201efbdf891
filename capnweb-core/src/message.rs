use serde_json::Value as JsonValue;

use crate::value::Value;

/// A pending call parsed from a `push` body's `["pipeline", importId,
/// methodPath, args?]` shape.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCall {
    pub method: String,
    pub args: Value,
}

/// An inbound message, per spec §4.1 / §6's grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// `["push", pushBody]`. `None` means the body was recognized as a
    /// push but did not match the one supported shape; per spec this is
    /// accepted silently and the message is dropped rather than
    /// rejected.
    Push(Option<PendingCall>),
    /// `["pull", exportId]`
    Pull(i64),
    /// `["release", exportId, refcount]`
    Release(i64, i64),
    /// `["abort", errorInfo]`
    Abort(JsonValue),
}

/// A message the session emits back to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Resolve(i64, JsonValue),
    Reject(i64, JsonValue),
}

impl Response {
    pub fn to_json(&self) -> JsonValue {
        match self {
            Response::Resolve(id, value) => serde_json::json!(["resolve", id, value]),
            Response::Reject(id, error) => serde_json::json!(["reject", id, error]),
        }
    }

    pub fn to_wire_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_json())
    }
}

/// Wrap a dispatcher's successful result per the array-escaping rule
/// (spec §4.1): a list result must be wrapped in an extra one-element
/// list so a resolve carrying a list is never confused with an outbound
/// message, which is itself a JSON array.
pub fn wrap_resolved_value(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Array(_) => JsonValue::Array(vec![value]),
        other => other,
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("message must be a JSON array")]
    NotAnArray,
    #[error("message array cannot be empty")]
    EmptyMessage,
    #[error("message tag must be a string")]
    TagNotAString,
}

/// Parse one inbound wire message.
///
/// Returns `Ok(None)` for an unknown tag (extensions are tolerated) or
/// for a recognized tag whose payload is wrongly typed — both are
/// silently ignored per spec §4.1, rather than aborting the session.
/// Returns `Err` only for the outer-shape failures the spec calls
/// `InvalidMessage`: not a list, an empty list, or a non-string tag.
pub fn parse_message(value: &JsonValue) -> Result<Option<Message>, MessageError> {
    let items = value.as_array().ok_or(MessageError::NotAnArray)?;
    let Some(tag_value) = items.first() else {
        return Err(MessageError::EmptyMessage);
    };
    let tag = tag_value.as_str().ok_or(MessageError::TagNotAString)?;

    let parsed = match tag {
        "push" => items.get(1).map(|body| Message::Push(parse_push_body(body))),
        "pull" => items.get(1).and_then(JsonValue::as_i64).map(Message::Pull),
        "release" => {
            let id = items.get(1).and_then(JsonValue::as_i64);
            let refcount = items.get(2).and_then(JsonValue::as_i64);
            match (id, refcount) {
                (Some(id), Some(refcount)) => Some(Message::Release(id, refcount)),
                _ => None,
            }
        }
        "abort" => items.get(1).cloned().map(Message::Abort),
        _ => None,
    };

    Ok(parsed)
}

fn parse_push_body(body: &JsonValue) -> Option<PendingCall> {
    let items = body.as_array()?;
    let tag = items.first()?.as_str()?;
    if tag != "pipeline" {
        return None;
    }
    // items[1] is the importId: reserved, parsed for shape validation
    // only and otherwise discarded (see DESIGN.md).
    items.get(1)?.as_i64()?;
    let method_path = items.get(2)?.as_array()?;
    let method = method_path.first()?.as_str()?.to_string();
    let args_json = items.get(3).cloned().unwrap_or(JsonValue::Array(Vec::new()));
    Some(PendingCall {
        method,
        args: Value::from_json(&args_json),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_push_with_args() {
        let msg = parse_message(&json!(["push", ["pipeline", 0, ["hello"], ["World"]]]))
            .unwrap()
            .unwrap();
        match msg {
            Message::Push(Some(call)) => {
                assert_eq!(call.method, "hello");
                assert_eq!(call.args, Value::from_json(&json!(["World"])));
            }
            other => panic!("expected push with call, got {other:?}"),
        }
    }

    #[test]
    fn push_args_default_to_empty_list() {
        let msg = parse_message(&json!(["push", ["pipeline", 0, ["getNotes"]]]))
            .unwrap()
            .unwrap();
        match msg {
            Message::Push(Some(call)) => assert_eq!(call.args, Value::empty_list()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn push_with_unrecognized_body_is_dropped_not_rejected() {
        let msg = parse_message(&json!(["push", ["somethingElse"]])).unwrap().unwrap();
        assert_eq!(msg, Message::Push(None));
    }

    #[test]
    fn pull_parses_export_id() {
        assert_eq!(
            parse_message(&json!(["pull", 7])).unwrap().unwrap(),
            Message::Pull(7)
        );
    }

    #[test]
    fn release_parses_id_and_refcount() {
        assert_eq!(
            parse_message(&json!(["release", 3, 1])).unwrap().unwrap(),
            Message::Release(3, 1)
        );
    }

    #[test]
    fn abort_carries_raw_error_info() {
        assert_eq!(
            parse_message(&json!(["abort", {"reason": "client gone"}]))
                .unwrap()
                .unwrap(),
            Message::Abort(json!({"reason": "client gone"}))
        );
    }

    #[test]
    fn unknown_tag_is_ignored() {
        assert_eq!(parse_message(&json!(["ping", 1])).unwrap(), None);
    }

    #[test]
    fn wrongly_typed_pull_payload_is_ignored() {
        assert_eq!(parse_message(&json!(["pull", "not-a-number"])).unwrap(), None);
    }

    #[test]
    fn non_array_message_is_invalid() {
        assert_eq!(parse_message(&json!({"not": "an array"})), Err(MessageError::NotAnArray));
    }

    #[test]
    fn empty_array_message_is_invalid() {
        assert_eq!(parse_message(&json!([])), Err(MessageError::EmptyMessage));
    }

    #[test]
    fn non_string_tag_is_invalid() {
        assert_eq!(parse_message(&json!([1, 2])), Err(MessageError::TagNotAString));
    }

    #[test]
    fn wrap_rule_wraps_lists_only() {
        assert_eq!(wrap_resolved_value(json!(["a", "b"])), json!([["a", "b"]]));
        assert_eq!(wrap_resolved_value(json!("scalar")), json!("scalar"));
        assert_eq!(wrap_resolved_value(json!({"k": "v"})), json!({"k": "v"}));
    }

    #[test]
    fn response_serializes_resolve_and_reject() {
        let resolve = Response::Resolve(1, json!("Hello, World!"));
        assert_eq!(resolve.to_json(), json!(["resolve", 1, "Hello, World!"]));

        let reject = Response::Reject(42, json!(["error", "ExportNotFound", "Export ID not found"]));
        assert_eq!(
            reject.to_json(),
            json!(["reject", 42, ["error", "ExportNotFound", "Export ID not found"]])
        );
    }
}
