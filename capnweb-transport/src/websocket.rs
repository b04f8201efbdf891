//! A [`FrameTransport`] over a `tokio-tungstenite` stream, and the
//! session-driving loop built on top of it.

use async_trait::async_trait;
use currentspace_capnweb_core::Session;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio_tungstenite::{tungstenite, WebSocketStream};
use tungstenite::protocol::Message as WsMessage;

use crate::transport::{FrameTransport, TransportError};

/// WebSocket text-frame transport. Binary frames are rejected: the
/// protocol carries JSON text only (spec.md's Non-goal on binary
/// framing).
pub struct WebSocketTransport<S> {
    stream: WebSocketStream<S>,
}

impl<S> WebSocketTransport<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send,
{
    pub fn new(stream: WebSocketStream<S>) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl<S> FrameTransport for WebSocketTransport<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send,
{
    async fn recv_text(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(WsMessage::Text(text))) => return Ok(Some(text.to_string())),
                Some(Ok(WsMessage::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/binary: ignore, keep reading
                Some(Err(e)) => return Err(TransportError::Protocol(e.to_string())),
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|e| TransportError::Protocol(e.to_string()))
    }
}

/// Drive one session to completion over `transport`: read frames,
/// hand each to `session`, write back whatever response it produces.
/// Returns once the peer closes the connection.
pub async fn run_session<T: FrameTransport>(
    mut transport: T,
    session: Arc<Session>,
) -> Result<(), TransportError> {
    while let Some(line) = transport.recv_text().await? {
        match session.handle_line(&line).await {
            Ok(Some(response)) => transport.send_text(response).await?,
            Ok(None) => {}
            Err(err) => tracing::error!(%err, %line, "dropping unparseable message"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use currentspace_capnweb_core::MockRpcTarget;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    /// An in-memory transport for exercising `run_session` without a
    /// real socket.
    struct ChannelTransport {
        inbox: VecDeque<String>,
        outbox: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl FrameTransport for ChannelTransport {
        async fn recv_text(&mut self) -> Result<Option<String>, TransportError> {
            Ok(self.inbox.pop_front())
        }

        async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
            self.outbox.lock().await.push(text);
            Ok(())
        }
    }

    #[tokio::test]
    async fn drives_push_then_pull_to_a_resolve() {
        let outbox = Arc::new(Mutex::new(Vec::new()));
        let transport = ChannelTransport {
            inbox: VecDeque::from([
                r#"["push",["pipeline",0,["hello"],["World"]]]"#.to_string(),
                r#"["pull",1]"#.to_string(),
            ]),
            outbox: outbox.clone(),
        };
        let session = Arc::new(Session::new(Arc::new(MockRpcTarget)));
        run_session(transport, session).await.unwrap();

        let sent = outbox.lock().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with(r#"["resolve",1,"#));
    }
}
