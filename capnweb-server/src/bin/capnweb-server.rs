//! Cap'n Web server binary: serves the session core over HTTP-batch and
//! WebSocket, dispatching to a small demo capability so the endpoints
//! are exercisable out of the box.

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use currentspace_capnweb_core::{RpcError, RpcTarget};
use currentspace_capnweb_server::{CapnWebServer, ServerConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// A demo dispatcher implementing the methods from spec.md §8's
/// end-to-end scenarios: a session store, an auth check, and a couple
/// of notes/paths to pipeline through.
#[derive(Debug, Default)]
struct DemoTarget;

#[async_trait]
impl RpcTarget for DemoTarget {
    async fn dispatch(&self, method: &str, args: Value) -> Result<Value, RpcError> {
        match method {
            "hello" => {
                let name = args
                    .get(0)
                    .and_then(Value::as_str)
                    .ok_or_else(|| RpcError::argument_error("hello expects a name string"))?;
                Ok(json!(format!("Hello, {name}!")))
            }
            "authenticate" => {
                let cookie = args
                    .get(0)
                    .and_then(Value::as_str)
                    .ok_or_else(|| RpcError::argument_error("authenticate expects a cookie string"))?;
                if cookie == "bad" {
                    return Err(RpcError::method_error("invalid session"));
                }
                Ok(json!({"id": "u_1", "name": "Ada Lovelace"}))
            }
            "getUserProfile" => {
                let id = args
                    .get(0)
                    .cloned()
                    .ok_or_else(|| RpcError::argument_error("getUserProfile expects a user id"))?;
                Ok(json!({"id": id, "bio": "Mathematician and first programmer."}))
            }
            "getNotes" => Ok(json!(["Remember the milk", "Ship the RPC core"])),
            "get" => Ok(json!({"a": [10, 20, 30]})),
            "echo" => Ok(args.get(0).cloned().unwrap_or(Value::Null)),
            other => Err(RpcError::method_error(format!("no such method: {other}"))),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();
    currentspace_capnweb_server::init_logging(&config.log_dir, "capnweb-server")?;

    info!(
        host = %config.host,
        port = config.port,
        max_batch_size = config.max_batch_size,
        "starting capnweb-server with the demo capability"
    );

    let server = CapnWebServer::new(config, Arc::new(DemoTarget));
    server.run().await
}
