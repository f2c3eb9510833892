use async_trait::async_trait;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tracing::{debug, info};

use crate::config::AgentConfig;
use crate::error::BridgeError;
use crate::transport::websocket::agent_connection;
use crate::transport::Connection;

/// Opens a new agent connection for each call.
#[async_trait]
pub trait AgentDialer: Send + Sync {
    async fn dial(&self) -> Result<Connection, BridgeError>;
}

/// Dials the agent endpoint over WebSocket, authenticating with the
/// `token` subprotocol.
#[derive(Debug, Clone)]
pub struct WebSocketDialer {
    url: String,
    api_key: String,
}

impl WebSocketDialer {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl AgentDialer for WebSocketDialer {
    async fn dial(&self) -> Result<Connection, BridgeError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| BridgeError::Config(format!("invalid agent url {}: {}", self.url, e)))?;

        let protocols = HeaderValue::from_str(&format!("token, {}", self.api_key)).map_err(|_| {
            BridgeError::Config("agent api key is not a valid header value".to_string())
        })?;
        request
            .headers_mut()
            .insert("Sec-WebSocket-Protocol", protocols);

        info!("Connecting to agent at {}", self.url);
        let (stream, response) = connect_async(request).await.map_err(|e| {
            BridgeError::TransportClosed(format!("failed to connect to agent: {}", e))
        })?;
        debug!("Agent handshake complete: {}", response.status());

        Ok(agent_connection(stream))
    }
}
