//! The axum HTTP/WebSocket server: wires a user-supplied `RpcTarget`
//! into the `POST /rpc/batch` and `GET /rpc/ws` endpoints, plus a
//! `/health` check, owns the session table, and runs the idle-session
//! sweep. Transports and routing are external collaborators to the
//! protocol core (spec.md §1); this module is where they're assembled.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use currentspace_capnweb_core::RpcTarget;
use currentspace_capnweb_transport::{FrameTransport, TransportError};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::sessions::SessionTable;

#[derive(Clone)]
struct AppState {
    sessions: SessionTable,
    max_batch_size: usize,
}

pub struct CapnWebServer {
    config: ServerConfig,
    state: AppState,
}

impl CapnWebServer {
    pub fn new(config: ServerConfig, target: Arc<dyn RpcTarget>) -> Self {
        Self {
            state: AppState {
                sessions: SessionTable::new(target),
                max_batch_size: config.max_batch_size,
            },
            config,
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/rpc/batch", post(handle_batch))
            .route("/rpc/ws", get(handle_websocket_upgrade))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Bind and serve, spawning the idle-session sweep alongside it.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.bind_addr();
        let sessions = self.state.sessions.clone();
        let sweep_interval = Duration::from_secs(self.config.sweep_interval_secs);
        let session_timeout = Duration::from_secs(self.config.session_timeout_secs);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            loop {
                ticker.tick().await;
                sessions.sweep(session_timeout);
            }
        });

        let app = self.router();
        info!(%addr, max_batch_size = self.config.max_batch_size, "starting capnweb-server");
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;
        Ok(())
    }
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({
            "status": "ok",
            "active_websocket_sessions": state.sessions.len(),
        })),
    )
}

#[tracing::instrument(skip(state, body), fields(body_len = body.len()))]
async fn handle_batch(State(state): State<AppState>, body: String) -> impl IntoResponse {
    let session = state.sessions.new_batch_session();
    match currentspace_capnweb_transport::handle_batch(&session, &body, state.max_batch_size).await {
        Ok(response_body) => (StatusCode::OK, [("content-type", "text/plain")], response_body).into_response(),
        Err(err) => (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    }
}

async fn handle_websocket_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| async move {
        let (session_id, session) = state.sessions.open();
        info!(session_id = %session_id, "websocket session opened");

        let transport = AxumWsTransport::new(socket, state.sessions.clone(), session_id.clone());
        if let Err(err) = currentspace_capnweb_transport::run_session(transport, session).await {
            warn!(session_id = %session_id, %err, "websocket session ended with an error");
        }

        state.sessions.close(&session_id);
    })
}

/// Adapts axum's split WebSocket sink/stream to [`FrameTransport`],
/// touching the session table's last-activity clock on every inbound
/// frame so the idle sweep sees genuine traffic.
struct AxumWsTransport {
    sink: SplitSink<WebSocket, WsMessage>,
    stream: SplitStream<WebSocket>,
    sessions: SessionTable,
    session_id: String,
}

impl AxumWsTransport {
    fn new(socket: WebSocket, sessions: SessionTable, session_id: String) -> Self {
        let (sink, stream) = socket.split();
        Self {
            sink,
            stream,
            sessions,
            session_id,
        }
    }
}

#[async_trait::async_trait]
impl FrameTransport for AxumWsTransport {
    async fn recv_text(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    self.sessions.touch(&self.session_id);
                    return Ok(Some(text.to_string()));
                }
                Some(Ok(WsMessage::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(TransportError::Protocol(e.to_string())),
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.sink
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|e| TransportError::Protocol(e.to_string()))
    }
}
