use async_trait::async_trait;
use axum::extract::ws::{self, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::{Connection, MessageSink, MessageSource, WireMessage};
use crate::error::BridgeError;

// ============================================================================
// Telephony leg: server-side socket accepted by axum
// ============================================================================

/// Wrap an upgraded telephony WebSocket.
pub fn telephony_connection(socket: WebSocket) -> Connection {
    let (sink, stream) = socket.split();
    Connection::new(
        Box::new(AxumSink { sink }),
        Box::new(AxumSource { stream }),
    )
}

struct AxumSink {
    sink: SplitSink<WebSocket, ws::Message>,
}

#[async_trait]
impl MessageSink for AxumSink {
    async fn send(&mut self, message: WireMessage) -> Result<(), BridgeError> {
        let message = match message {
            WireMessage::Text(text) => ws::Message::Text(text),
            WireMessage::Binary(data) => ws::Message::Binary(data),
        };
        self.sink
            .send(message)
            .await
            .map_err(|e| BridgeError::TransportClosed(format!("telephony send failed: {}", e)))
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        self.sink
            .close()
            .await
            .map_err(|e| BridgeError::TransportClosed(format!("telephony close failed: {}", e)))
    }
}

struct AxumSource {
    stream: SplitStream<WebSocket>,
}

#[async_trait]
impl MessageSource for AxumSource {
    async fn recv(&mut self) -> Option<Result<WireMessage, BridgeError>> {
        loop {
            match self.stream.next().await? {
                Ok(ws::Message::Text(text)) => return Some(Ok(WireMessage::Text(text))),
                Ok(ws::Message::Binary(data)) => return Some(Ok(WireMessage::Binary(data))),
                Ok(ws::Message::Close(_)) => return None,
                // Ping/pong are answered by axum itself
                Ok(_) => continue,
                Err(e) => {
                    return Some(Err(BridgeError::TransportClosed(format!(
                        "telephony receive failed: {}",
                        e
                    ))))
                }
            }
        }
    }
}

// ============================================================================
// Agent leg: client socket opened with tokio-tungstenite
// ============================================================================

pub type AgentStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Wrap a connected agent WebSocket.
pub fn agent_connection(stream: AgentStream) -> Connection {
    let (sink, stream) = stream.split();
    Connection::new(
        Box::new(TungsteniteSink { sink }),
        Box::new(TungsteniteSource { stream }),
    )
}

struct TungsteniteSink {
    sink: SplitSink<AgentStream, tungstenite::Message>,
}

#[async_trait]
impl MessageSink for TungsteniteSink {
    async fn send(&mut self, message: WireMessage) -> Result<(), BridgeError> {
        let message = match message {
            WireMessage::Text(text) => tungstenite::Message::Text(text.into()),
            WireMessage::Binary(data) => tungstenite::Message::Binary(data.into()),
        };
        self.sink
            .send(message)
            .await
            .map_err(|e| BridgeError::TransportClosed(format!("agent send failed: {}", e)))
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        self.sink
            .close()
            .await
            .map_err(|e| BridgeError::TransportClosed(format!("agent close failed: {}", e)))
    }
}

struct TungsteniteSource {
    stream: SplitStream<AgentStream>,
}

#[async_trait]
impl MessageSource for TungsteniteSource {
    async fn recv(&mut self) -> Option<Result<WireMessage, BridgeError>> {
        loop {
            match self.stream.next().await? {
                Ok(tungstenite::Message::Text(text)) => {
                    return Some(Ok(WireMessage::Text(text.as_str().to_owned())))
                }
                Ok(tungstenite::Message::Binary(data)) => {
                    return Some(Ok(WireMessage::Binary(data.to_vec())))
                }
                Ok(tungstenite::Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => {
                    return Some(Err(BridgeError::TransportClosed(format!(
                        "agent receive failed: {}",
                        e
                    ))))
                }
            }
        }
    }
}
