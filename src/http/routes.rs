use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::get_status))
        // Session log
        .route(
            "/messages",
            get(handlers::list_messages).post(handlers::send_message),
        )
        .route("/input", put(handlers::set_input))
        .route(
            "/messages/:message_id/reactions",
            post(handlers::toggle_reaction),
        )
        .route(
            "/messages/:message_id/picker",
            post(handlers::toggle_reaction_picker),
        )
        .route(
            "/messages/:message_id/playback",
            post(handlers::toggle_playback),
        )
        // Voice input
        .route("/recording/start", post(handlers::start_recording))
        .route("/recording/stop", post(handlers::stop_recording))
        .route("/notices", get(handlers::take_notices))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
