use super::state::AppState;
use crate::error::BridgeError;
use crate::session::{CallSession, SessionStats};
use crate::transport::websocket::telephony_connection;
use crate::transport::Connection;
use axum::{
    extract::{ws::WebSocketUpgrade, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    /// Text to synthesize into the call
    pub text: String,

    /// Voice model (default: synthesis.default_model)
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SpeakResponse {
    pub stream_sid: String,
    pub frames: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /twilio
/// Telephony media stream; each connection becomes one call session
pub async fn telephony_stream(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        run_call(state, telephony_connection(socket)).await;
    })
}

/// Bridge one telephony connection to a freshly dialed agent connection.
///
/// The session is listed under its stream identifier from the moment the
/// caller's `start` event arrives until the call ends.
pub async fn run_call(state: AppState, telephony: Connection) {
    let agent = match state.dialer.dial().await {
        Ok(agent) => agent,
        Err(e) => {
            error!("Failed to open agent connection: {}", e);
            let mut sink = telephony.sink;
            if let Err(e) = sink.close().await {
                warn!("Failed to close telephony connection: {}", e);
            }
            return;
        }
    };

    let session = CallSession::new(state.session_config.clone(), state.tools.clone());
    let handle = session.handle();

    let register = {
        let sessions = state.sessions.clone();
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Some(stream_sid) = handle.wait_for_stream_sid().await {
                info!("Registering call session: {}", stream_sid);
                sessions.write().await.insert(stream_sid, handle);
            }
        })
    };

    match session.run(telephony, agent).await {
        Ok(stats) => info!(
            "Call session {} finished after {:.1}s",
            stats.connection_id, stats.duration_secs
        ),
        Err(e) => error!("Call session {} failed: {}", handle.connection_id(), e),
    }

    register.abort();
    let _ = register.await;

    if let Some(stream_sid) = handle.stream_sid() {
        let mut sessions = state.sessions.write().await;
        let ours = sessions
            .get(&stream_sid)
            .is_some_and(|registered| registered.connection_id() == handle.connection_id());
        if ours {
            sessions.remove(&stream_sid);
        }
    }
}

/// GET /sessions
/// List stats for all active calls
pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let sessions = state.sessions.read().await;
    let mut stats: Vec<SessionStats> = sessions.values().map(|handle| handle.stats()).collect();
    stats.sort_by(|a, b| a.started_at.cmp(&b.started_at));
    Json(stats)
}

/// GET /sessions/:stream_sid
/// Stats for one call
pub async fn get_session(
    State(state): State<AppState>,
    Path(stream_sid): Path<String>,
) -> Response {
    let sessions = state.sessions.read().await;
    match sessions.get(&stream_sid) {
        Some(handle) => Json(handle.stats()).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("No active call for stream {}", stream_sid),
        ),
    }
}

/// POST /sessions/:stream_sid/speak
/// Synthesize text and queue it for the call's agent leg
pub async fn speak(
    State(state): State<AppState>,
    Path(stream_sid): Path<String>,
    Json(req): Json<SpeakRequest>,
) -> Response {
    let producer = {
        let sessions = state.sessions.read().await;
        match sessions.get(&stream_sid) {
            Some(handle) => handle.producer(),
            None => {
                return error_response(
                    StatusCode::NOT_FOUND,
                    format!("No active call for stream {}", stream_sid),
                )
            }
        }
    };

    info!("Speaking into call {}", stream_sid);

    match state
        .synthesis
        .speak(&req.text, req.model.as_deref(), &producer)
        .await
    {
        Ok(frames) => (
            StatusCode::OK,
            Json(SpeakResponse { stream_sid, frames }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to speak into call {}: {}", stream_sid, e);
            let status = match &e {
                BridgeError::SynthesisFailed(_) => StatusCode::BAD_GATEWAY,
                BridgeError::UnsupportedFormat(_) => StatusCode::UNPROCESSABLE_ENTITY,
                BridgeError::TransportClosed(_) => StatusCode::GONE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error_response(status, e.to_string())
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
