//! HTTP-batch framing: one POST body carrying newline-separated wire
//! messages, one response body carrying newline-separated replies
//! (spec.md §6).

use currentspace_capnweb_core::Session;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpBatchError {
    #[error("batch contains {found} messages, exceeding the configured limit of {limit}")]
    TooManyMessages { found: usize, limit: usize },
}

/// Run one HTTP-batch request body against `session`, rejecting it
/// up front if it carries more than `max_batch_size` non-blank lines.
/// This cap is an ambient resource guard (SPEC_FULL §10.3), not part of
/// the wire protocol itself: a transport may choose not to enforce it.
pub async fn handle_batch(
    session: &Session,
    body: &str,
    max_batch_size: usize,
) -> Result<String, HttpBatchError> {
    let line_count = body.lines().filter(|l| !l.trim().is_empty()).count();
    if line_count > max_batch_size {
        return Err(HttpBatchError::TooManyMessages {
            found: line_count,
            limit: max_batch_size,
        });
    }
    Ok(currentspace_capnweb_core::handle_batch(session, body).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use currentspace_capnweb_core::MockRpcTarget;
    use std::sync::Arc;

    #[tokio::test]
    async fn runs_a_batch_under_the_limit() {
        let session = Session::new(Arc::new(MockRpcTarget));
        let out = handle_batch(&session, r#"["pull",42]"#, 100).await.unwrap();
        assert!(out.contains("ExportNotFound"));
    }

    #[tokio::test]
    async fn rejects_a_batch_over_the_limit() {
        let session = Session::new(Arc::new(MockRpcTarget));
        let body = std::iter::repeat(r#"["pull",1]"#).take(5).collect::<Vec<_>>().join("\n");
        let err = handle_batch(&session, &body, 3).await.unwrap_err();
        assert!(matches!(err, HttpBatchError::TooManyMessages { found: 5, limit: 3 }));
    }
}
