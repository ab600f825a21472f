use super::state::AppState;
use crate::chat::{Message, MessageId};
use crate::error::ChatError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SetInputRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    pub emoji: String,
}

#[derive(Debug, Serialize)]
pub struct RecordingResponse {
    pub status: String,
    pub message: Option<Message>,
}

#[derive(Debug, Serialize)]
pub struct PickerResponse {
    pub open_on: Option<MessageId>,
}

#[derive(Debug, Serialize)]
pub struct PlaybackResponse {
    pub playing: bool,
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

fn chat_error_response(err: ChatError) -> Response {
    let status = match err {
        ChatError::DeviceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        ChatError::NoActiveRecording => StatusCode::CONFLICT,
        ChatError::TranslationFailed(_) => StatusCode::BAD_GATEWAY,
        ChatError::NotFound(_) => StatusCode::NOT_FOUND,
        ChatError::CaptureFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.user_message())
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /messages
/// Current session log
pub async fn list_messages(State(state): State<AppState>) -> impl IntoResponse {
    let messages = state.controller.messages();
    (StatusCode::OK, Json(messages.to_vec()))
}

/// POST /messages
/// Replace the draft and send it
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> impl IntoResponse {
    if !state.controller.set_input(&req.text) {
        return error_response(StatusCode::CONFLICT, "Text input is disabled while recording");
    }

    match state.controller.send_text().await {
        Ok(Some(message)) => (StatusCode::OK, Json(message)).into_response(),
        Ok(None) => error_response(StatusCode::CONFLICT, "Message not sent"),
        Err(e) => chat_error_response(e),
    }
}

/// PUT /input
/// Update the text draft (disables voice input while non-empty)
pub async fn set_input(
    State(state): State<AppState>,
    Json(req): Json<SetInputRequest>,
) -> impl IntoResponse {
    if state.controller.set_input(&req.text) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(StatusCode::CONFLICT, "Text input is disabled while recording")
    }
}

/// POST /messages/:message_id/reactions
/// Toggle this participant's reaction
pub async fn toggle_reaction(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Json(req): Json<ReactionRequest>,
) -> impl IntoResponse {
    let id = MessageId::new(message_id);

    match state.controller.toggle_reaction(&id, &req.emoji).await {
        Some(message) => (StatusCode::OK, Json(message)).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("Message {} not found", id)),
    }
}

/// POST /messages/:message_id/picker
/// Open or close the reaction picker on a message
pub async fn toggle_reaction_picker(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> impl IntoResponse {
    let open_on = state
        .controller
        .toggle_reaction_picker(&MessageId::new(message_id));
    (StatusCode::OK, Json(PickerResponse { open_on }))
}

/// POST /messages/:message_id/playback
/// Play or pause a voice message
pub async fn toggle_playback(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> impl IntoResponse {
    match state
        .controller
        .toggle_playback(&MessageId::new(message_id))
        .await
    {
        Ok(playing) => (StatusCode::OK, Json(PlaybackResponse { playing })).into_response(),
        Err(e) => chat_error_response(e),
    }
}

/// POST /recording/start
/// Begin voice input
pub async fn start_recording(State(state): State<AppState>) -> impl IntoResponse {
    match state.controller.start_recording().await {
        Ok(true) => {
            info!("Recording started via API");
            (
                StatusCode::OK,
                Json(RecordingResponse {
                    status: "recording".to_string(),
                    message: None,
                }),
            )
                .into_response()
        }
        Ok(false) => error_response(StatusCode::CONFLICT, "Recording not started"),
        Err(e) => chat_error_response(e),
    }
}

/// POST /recording/stop
/// Finish voice input and send the clip
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    match state.controller.stop_recording().await {
        Ok(message) => (
            StatusCode::OK,
            Json(RecordingResponse {
                status: "idle".to_string(),
                message,
            }),
        )
            .into_response(),
        Err(e) => chat_error_response(e),
    }
}

/// GET /status
/// Transient UI state of this tab
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.controller.status()))
}

/// GET /notices
/// Drain pending notices
pub async fn take_notices(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.controller.take_notices()))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
