//! Framing adapters that turn a raw text stream into
//! `currentspace-capnweb-core` session messages and back: one JSON array
//! per WebSocket text frame, or newline-separated JSON arrays in one
//! HTTP-batch body (spec.md §6). The protocol itself — parsing,
//! pipelining, dispatch — lives in `currentspace-capnweb-core`; this
//! crate only moves bytes.

#[cfg(feature = "http-batch")]
pub mod http_batch;
pub mod transport;
#[cfg(feature = "websocket")]
pub mod websocket;

#[cfg(feature = "http-batch")]
pub use http_batch::{handle_batch, HttpBatchError};
pub use transport::{FrameTransport, TransportError};
#[cfg(feature = "websocket")]
pub use websocket::{run_session, WebSocketTransport};
