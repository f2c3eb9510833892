use anyhow::{Context, Result};
use call_bridge::{
    create_router, AppState, Config, HttpSynthesizer, SessionConfig, SynthesisPipeline,
    ToolRegistry, WebSocketDialer,
};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Telephony to voice-agent audio bridge
#[derive(Debug, Parser)]
#[command(name = "call-bridge", version)]
struct Cli {
    /// Config file (without extension)
    #[arg(long, default_value = "config/call-bridge")]
    config: String,

    /// Override the HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("call_bridge=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut cfg = Config::load(&cli.config)?;
    if let Some(port) = cli.port {
        cfg.service.http.port = port;
    }

    info!("Call Bridge v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!("Agent endpoint: {}", cfg.agent.url);
    info!("Synthesis endpoint: {}", cfg.synthesis.url);

    if cfg.agent.api_key.is_empty() {
        warn!("agent.api_key is empty; set CALL_BRIDGE__AGENT__API_KEY");
    }
    if cfg.synthesis.api_key.is_empty() {
        warn!("synthesis.api_key is empty; set CALL_BRIDGE__SYNTHESIS__API_KEY");
    }

    let session_config = SessionConfig::new(cfg.agent.load_settings()?);
    let dialer = Arc::new(WebSocketDialer::new(&cfg.agent));
    let synthesizer = Arc::new(HttpSynthesizer::new(&cfg.synthesis)?);
    let synthesis = Arc::new(SynthesisPipeline::new(
        synthesizer,
        cfg.synthesis.default_model.clone(),
    ));
    let tools = Arc::new(ToolRegistry::new());

    let state = AppState::new(dialer, synthesis, tools, session_config);
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);
    info!("Telephony stream endpoint: ws://{}/twilio", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
