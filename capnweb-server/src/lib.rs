//! Axum-based server exposing `currentspace-capnweb-core`'s session
//! engine over HTTP-batch and WebSocket endpoints.

pub mod config;
pub mod logging;
pub mod server;
pub mod sessions;

pub use config::ServerConfig;
pub use logging::{init_logging, init_test_logging};
pub use server::CapnWebServer;
pub use sessions::SessionTable;

pub use currentspace_capnweb_core::{MockRpcTarget, RpcTarget};
