use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;

/// Environment variables override file settings, e.g.
/// `CALL_BRIDGE__AGENT__API_KEY`.
pub const ENV_PREFIX: &str = "CALL_BRIDGE";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub agent: AgentConfig,
    pub synthesis: SynthesisConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub url: String,
    pub api_key: String,
    /// JSON settings document sent to the agent at session start
    pub settings_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    pub url: String,
    pub api_key: String,
    pub default_model: String,
    pub timeout_secs: u64,
}

impl Config {
    /// Load `path` (any format the `config` crate understands, extension
    /// optional) over built-in defaults, then apply environment overrides.
    /// A missing file is not an error.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "call-bridge")?
            .set_default("service.http.bind", "0.0.0.0")?
            .set_default("service.http.port", 5000_i64)?
            .set_default("agent.url", "wss://agent.deepgram.com/v1/agent/converse")?
            .set_default("agent.api_key", "")?
            .set_default("synthesis.url", "https://api.deepgram.com/v1/speak")?
            .set_default("synthesis.api_key", "")?
            .set_default("synthesis.default_model", "aura-2-thalia-en")?
            .set_default("synthesis.timeout_secs", 30_i64)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        Ok(settings.try_deserialize()?)
    }
}

impl AgentConfig {
    /// The settings handshake: the file at `settings_path`, or the built-in
    /// defaults.
    pub fn load_settings(&self) -> Result<serde_json::Value> {
        match &self.settings_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read agent settings: {}", path))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse agent settings: {}", path))
            }
            None => Ok(default_agent_settings()),
        }
    }
}

/// Agent settings for an 8 kHz μ-law phone call.
pub fn default_agent_settings() -> serde_json::Value {
    json!({
        "type": "Settings",
        "audio": {
            "input": { "encoding": "mulaw", "sample_rate": 8000 },
            "output": { "encoding": "mulaw", "sample_rate": 8000, "container": "none" }
        },
        "agent": {
            "language": "en",
            "listen": { "provider": { "type": "deepgram", "model": "nova-3" } },
            "think": {
                "provider": { "type": "open_ai", "model": "gpt-4o-mini" },
                "prompt": "You are a helpful assistant answering phone calls. Keep replies short."
            },
            "speak": { "provider": { "type": "deepgram", "model": "aura-2-thalia-en" } },
            "greeting": "Hello! How can I help you today?"
        }
    })
}
