//! Batch-level text framing: a transport hands the core a block of text
//! containing zero or more newline-separated messages and gets back the
//! text to send in reply (spec §6's "wire format").

use crate::engine::{Session, SessionError};

/// Split `batch` into non-blank lines, feed each to `session` in order,
/// and join the non-empty responses with line feeds.
///
/// A line that fails to parse is logged by the caller's tracing
/// subscriber (via the `tracing::error!` inside this function) and
/// dropped, per spec §7: "Parse errors on the overall inbound message...
/// return to the transport layer; transports may log and drop."
pub async fn handle_batch(session: &Session, batch: &str) -> String {
    let mut responses = Vec::new();
    for line in batch.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match session.handle_line(line).await {
            Ok(Some(response)) => responses.push(response),
            Ok(None) => {}
            Err(err) => tracing::error!(%err, %line, "dropping unparseable message"),
        }
    }
    responses.join("\n")
}

/// The per-line counterpart for transports that already frame one
/// message per call (e.g. one WebSocket frame = one message).
pub async fn handle_line(session: &Session, line: &str) -> Result<Option<String>, SessionError> {
    session.handle_line(line).await
}
