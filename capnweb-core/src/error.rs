use std::fmt;

/// The error kinds surfaced on the wire, per the reject error-value triple
/// `["error", kind, message]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The args field of a push body failed to parse as a value tree.
    ArgumentError,
    /// The pipeline resolver hit an unknown export, an out-of-bounds or
    /// malformed path, or a self-referential cycle.
    PipelineError,
    /// Resolved args could not be re-serialized for dispatch.
    SerializationError,
    /// The method dispatcher returned an error.
    MethodError,
    /// `pull` was called on an id with neither a pending op nor a result.
    ExportNotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ArgumentError => "ArgumentError",
            ErrorKind::PipelineError => "PipelineError",
            ErrorKind::SerializationError => "SerializationError",
            ErrorKind::MethodError => "MethodError",
            ErrorKind::ExportNotFound => "ExportNotFound",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that can be surfaced to the client as a `reject` response.
///
/// This is the boundary error type: every failure path in the core
/// eventually becomes one of these before being handed to the message
/// codec. Internal errors (`TableFault`, `MessageError`, ...) convert
/// into it rather than being passed around directly.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RpcError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RpcError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn argument_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ArgumentError, message)
    }

    pub fn pipeline_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PipelineError, message)
    }

    pub fn serialization_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SerializationError, message)
    }

    pub fn method_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MethodError, message)
    }

    pub fn export_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExportNotFound, message)
    }

    /// The `["error", kind, message]` triple used on the wire.
    pub fn to_wire_value(&self) -> serde_json::Value {
        serde_json::json!(["error", self.kind.as_str(), self.message])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_value_shape() {
        let err = RpcError::export_not_found("Export ID not found");
        assert_eq!(
            err.to_wire_value(),
            serde_json::json!(["error", "ExportNotFound", "Export ID not found"])
        );
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = RpcError::method_error("invalid session");
        assert_eq!(format!("{err}"), "MethodError: invalid session");
    }
}
