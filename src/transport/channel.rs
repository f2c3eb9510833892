use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Connection, MessageSink, MessageSource, WireMessage};
use crate::error::BridgeError;

/// Create an in-memory connection.
///
/// The [`Connection`] is handed to the bridge; the [`Peer`] plays the remote
/// side (telephony provider or agent endpoint).
pub fn pair() -> (Connection, Peer) {
    let (to_peer_tx, to_peer_rx) = mpsc::unbounded_channel();
    let (from_peer_tx, from_peer_rx) = mpsc::unbounded_channel();

    let connection = Connection::new(
        Box::new(ChannelSink {
            tx: Some(to_peer_tx),
        }),
        Box::new(ChannelSource { rx: from_peer_rx }),
    );
    let peer = Peer {
        tx: Some(from_peer_tx),
        rx: to_peer_rx,
    };

    (connection, peer)
}

struct ChannelSink {
    tx: Option<mpsc::UnboundedSender<WireMessage>>,
}

#[async_trait]
impl MessageSink for ChannelSink {
    async fn send(&mut self, message: WireMessage) -> Result<(), BridgeError> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| BridgeError::TransportClosed("connection closed locally".to_string()))?;
        tx.send(message)
            .map_err(|_| BridgeError::TransportClosed("peer went away".to_string()))
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        self.tx.take();
        Ok(())
    }
}

struct ChannelSource {
    rx: mpsc::UnboundedReceiver<WireMessage>,
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn recv(&mut self) -> Option<Result<WireMessage, BridgeError>> {
        self.rx.recv().await.map(Ok)
    }
}

/// Remote end of an in-memory connection.
pub struct Peer {
    tx: Option<mpsc::UnboundedSender<WireMessage>>,
    rx: mpsc::UnboundedReceiver<WireMessage>,
}

impl Peer {
    /// Send a message to the bridge. Returns false if the bridge side is gone.
    pub fn send(&self, message: WireMessage) -> bool {
        match &self.tx {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }

    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.send(WireMessage::Text(text.into()))
    }

    pub fn send_json(&self, value: &serde_json::Value) -> bool {
        self.send_text(value.to_string())
    }

    pub fn send_binary(&self, data: Vec<u8>) -> bool {
        self.send(WireMessage::Binary(data))
    }

    /// Next message from the bridge, `None` once the bridge closed its sink.
    pub async fn recv(&mut self) -> Option<WireMessage> {
        self.rx.recv().await
    }

    /// Take a message if one is already waiting.
    pub fn try_recv(&mut self) -> Option<WireMessage> {
        self.rx.try_recv().ok()
    }

    /// Stop accepting messages from the bridge; its sends fail from now on.
    /// Messages already delivered can still be read.
    pub fn close_receiving(&mut self) {
        self.rx.close();
    }

    /// End the stream towards the bridge, as if the remote side disconnected.
    pub fn hang_up(&mut self) {
        self.tx.take();
    }
}
