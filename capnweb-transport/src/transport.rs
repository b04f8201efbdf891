//! The transport-facing abstraction: a source/sink of whole text frames.
//!
//! Per spec.md §6, the wire format is UTF-8 text and framing is the
//! transport's concern, not the core's: one JSON array per WebSocket
//! text frame, or newline-separated JSON arrays in one HTTP-batch body.
//! [`FrameTransport`] lets [`crate::run_session`] drive either shape
//! with the same loop.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// A transport that exchanges whole text frames with a peer. One frame
/// is one wire message (spec.md's grammar): for WebSocket, one text
/// frame; for HTTP-batch, the crate instead calls
/// `currentspace_capnweb_core::handle_batch` directly and never needs
/// this trait.
#[async_trait]
pub trait FrameTransport: Send {
    /// Receive the next text frame, or `None` on a clean close.
    async fn recv_text(&mut self) -> Result<Option<String>, TransportError>;
    /// Send one text frame.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;
}
