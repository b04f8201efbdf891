use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::error::RpcError;
use crate::ids::ExportId;

/// One selector in a pipeline reference's path: an object key or an
/// array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    /// An array-index selector as written on the wire. Stored signed so a
    /// negative index is still recognized as part of a pipeline reference's
    /// path rather than silently falling back to "not a reference"; it is
    /// rejected with `BadPath` when the path is actually walked.
    Index(i64),
}

/// A value tree node.
///
/// Pipeline references are recognized once, at parse time, rather than
/// re-matched against `["pipeline", ...]` on every resolver step: this
/// removes the ambiguity between a plain list that happens to start
/// with the string `"pipeline"` and an actual reference, and keeps the
/// resolver free of wire-shape concerns.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    /// `["pipeline", id, path?]`
    PipelineRef { id: ExportId, path: Vec<PathSegment> },
}

impl Value {
    pub fn empty_list() -> Self {
        Value::List(Vec::new())
    }

    /// Does this value's outermost tag mark it as an `["error", kind,
    /// message]` value stored in the results table?
    pub fn as_error_triple(&self) -> Option<(&str, &str)> {
        if let Value::List(items) = self {
            if let [Value::String(tag), Value::String(kind), Value::String(message)] =
                items.as_slice()
            {
                if tag == "error" {
                    return Some((kind, message));
                }
            }
        }
        None
    }

    /// Parse a JSON value into a value tree, recognizing pipeline
    /// references. Total: any JSON value maps onto some `Value`.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => Value::Number(n.clone()),
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => {
                if let Some(reference) = Self::try_parse_pipeline_ref(items) {
                    return reference;
                }
                Value::List(items.iter().map(Value::from_json).collect())
            }
            JsonValue::Object(obj) => {
                let mut map = IndexMap::with_capacity(obj.len());
                for (k, v) in obj {
                    map.insert(k.clone(), Value::from_json(v));
                }
                Value::Map(map)
            }
        }
    }

    fn try_parse_pipeline_ref(items: &[JsonValue]) -> Option<Value> {
        let tag = items.first()?.as_str()?;
        if tag != "pipeline" {
            return None;
        }
        let id = items.get(1)?.as_i64()?;
        let path = match items.get(2) {
            None | Some(JsonValue::Null) => Vec::new(),
            Some(JsonValue::Array(segments)) => {
                let mut out = Vec::with_capacity(segments.len());
                for seg in segments {
                    out.push(match seg {
                        JsonValue::String(s) => PathSegment::Key(s.clone()),
                        JsonValue::Number(n) => PathSegment::Index(n.as_i64()?),
                        _ => return None,
                    });
                }
                out
            }
            _ => return None,
        };
        Some(Value::PipelineRef {
            id: ExportId(id),
            path,
        })
    }

    /// Convert a fully-resolved value tree (no `PipelineRef` nodes left)
    /// back into plain JSON for handing to a method dispatcher.
    pub fn into_json(self) -> Result<JsonValue, RpcError> {
        Ok(match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(b),
            Value::Number(n) => JsonValue::Number(n),
            Value::String(s) => JsonValue::String(s),
            Value::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(item.into_json()?);
                }
                JsonValue::Array(out)
            }
            Value::Map(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k, v.into_json()?);
                }
                JsonValue::Object(out)
            }
            Value::PipelineRef { id, .. } => {
                return Err(RpcError::serialization_error(format!(
                    "unresolved pipeline reference to export {id} cannot be serialized"
                )));
            }
        })
    }

    /// Walk a path of selectors through this value, per §4.3:
    /// a missing object key yields `Null`; an out-of-range array index
    /// is an error; any other combination is a malformed path.
    pub fn walk_path(&self, path: &[PathSegment]) -> Result<Value, RpcError> {
        let mut current = self;
        let mut owned: Option<Value>;
        for segment in path {
            let next = match (current, segment) {
                (Value::Map(map), PathSegment::Key(key)) => {
                    match map.get(key) {
                        Some(v) => v.clone(),
                        None => Value::Null,
                    }
                }
                (Value::List(items), PathSegment::Index(idx)) => {
                    let idx: usize = (*idx)
                        .try_into()
                        .map_err(|_| RpcError::pipeline_error("path index must not be negative"))?;
                    items
                        .get(idx)
                        .cloned()
                        .ok_or_else(|| RpcError::pipeline_error("path index out of bounds"))?
                }
                _ => {
                    return Err(RpcError::pipeline_error(
                        "path selector does not match value shape",
                    ))
                }
            };
            owned = Some(next);
            current = owned.as_ref().unwrap();
        }
        Ok(current.clone())
    }
}
