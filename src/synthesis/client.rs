use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Serialize;
use tracing::debug;

use crate::config::SynthesisConfig;
use crate::error::BridgeError;

/// External speech synthesis service.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with `model`, returning a complete WAV container.
    async fn synthesize(&self, text: &str, model: &str) -> Result<Vec<u8>, BridgeError>;
}

#[derive(Debug, Serialize)]
struct SpeakRequest<'a> {
    text: &'a str,
    model: &'a str,
}

/// HTTP synthesis client (`POST` text, receive `audio/wav`).
#[derive(Debug, Clone)]
pub struct HttpSynthesizer {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpSynthesizer {
    pub fn new(config: &SynthesisConfig) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BridgeError::Config(format!("synthesis client: {}", e)))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str, model: &str) -> Result<Vec<u8>, BridgeError> {
        debug!("Requesting synthesis ({} chars, model {})", text.len(), model);

        let response = self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, format!("Token {}", self.api_key))
            .header(ACCEPT, "audio/wav")
            .json(&SpeakRequest { text, model })
            .send()
            .await
            .map_err(|e| BridgeError::SynthesisFailed(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::SynthesisFailed(format!(
                "service returned {}: {}",
                status, body
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| BridgeError::SynthesisFailed(format!("failed to read audio: {}", e)))?;

        Ok(audio.to_vec())
    }
}
