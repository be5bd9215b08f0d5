use super::state::AppState;
use crate::lifecycle::{SessionStart, SessionStop};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Envelope delivered by the event-notification service
#[derive(Debug, Deserialize)]
pub struct TriggerEvent {
    pub event: String,

    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Serialize)]
pub struct EventAck {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ActionItemsResponse {
    pub session_id: String,
    pub action_items: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

const EVENT_SESSION_STARTED: &str = "meeting.rtms_started";
const EVENT_SESSION_STOPPED: &str = "meeting.rtms_stopped";

// ============================================================================
// Handlers
// ============================================================================

/// POST /events
/// Receive one trigger event. Receipt is always acknowledged with 200:
/// session startup happens asynchronously and its failures are reported
/// through the log sink, never back to the notification service.
pub async fn receive_event(
    State(state): State<AppState>,
    Json(event): Json<TriggerEvent>,
) -> impl IntoResponse {
    match event.event.as_str() {
        EVENT_SESSION_STARTED => match serde_json::from_value::<SessionStart>(event.payload) {
            Ok(start) => {
                let controller = Arc::clone(&state.controller);
                tokio::spawn(async move {
                    controller.on_session_start(start).await;
                });
            }
            Err(e) => warn!("unusable session-start payload: {e}"),
        },
        EVENT_SESSION_STOPPED => match serde_json::from_value::<SessionStop>(event.payload) {
            Ok(stop) => {
                let controller = Arc::clone(&state.controller);
                tokio::spawn(async move {
                    controller.on_session_stop(stop).await;
                });
            }
            Err(e) => warn!("unusable session-stop payload: {e}"),
        },
        other => {
            info!(event = other, "ignoring unrecognized trigger event");
        }
    }

    (
        StatusCode::OK,
        Json(EventAck {
            status: "received".to_string(),
        }),
    )
}

/// GET /sessions/:session_id/action-items
/// Action items extracted so far for a live session
pub async fn get_action_items(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.controller.action_items(&session_id).await {
        Some(action_items) => (
            StatusCode::OK,
            Json(ActionItemsResponse {
                session_id,
                action_items,
            }),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("No session found: {session_id}"),
            }),
        )
            .into_response(),
    }
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
