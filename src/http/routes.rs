use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Telephony media stream
        .route("/twilio", get(handlers::telephony_stream))
        // Session queries
        .route("/sessions", get(handlers::list_sessions))
        .route("/sessions/:stream_sid", get(handlers::get_session))
        // Inject synthesized speech
        .route("/sessions/:stream_sid/speak", post(handlers::speak))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
