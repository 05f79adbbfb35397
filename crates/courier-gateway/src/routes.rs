//! API route handlers for the gateway.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
};
use courier_core::types::NewMessage;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::{Arc, LazyLock};

use super::server::AppState;

type ApiResponse = (StatusCode, Json<Value>);

/// E.164: leading `+`, non-zero first digit, at most 15 digits.
const PHONE_PATTERN: &str = r"^\+[1-9]\d{1,14}$";

static PHONE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(PHONE_PATTERN).ok());

fn is_valid_phone(to: &str) -> bool {
    PHONE_RE.as_ref().is_some_and(|re| re.is_match(to))
}

fn error_response(status: StatusCode, error: &str, message: &str, code: &str) -> ApiResponse {
    (
        status,
        Json(json!({
            "error": error,
            "message": message,
            "code": code,
        })),
    )
}

fn internal_error(context: &str, err: impl std::fmt::Display) -> ApiResponse {
    tracing::error!("API error: {context}: {err}");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": context })))
}

/// Health check endpoint.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
pub struct AutoParams {
    pub action: Option<String>,
}

/// Start or stop automatic sending via `?action=start|stop`.
pub async fn auto_control(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AutoParams>,
) -> ApiResponse {
    match params.action.as_deref() {
        Some("start") => {
            state.scheduler.start().await;
            (StatusCode::OK, Json(json!({ "status": "started" })))
        }
        Some("stop") => {
            state.scheduler.stop().await;
            (StatusCode::OK, Json(json!({ "status": "stopped" })))
        }
        _ => error_response(
            StatusCode::BAD_REQUEST,
            "Invalid action parameter",
            "Action must be either 'start' or 'stop'",
            "INVALID_ACTION",
        ),
    }
}

/// Scheduler state and queue depth.
pub async fn scheduler_status(State(state): State<Arc<AppState>>) -> ApiResponse {
    let unsent = match state.store.count_unsent().await {
        Ok(n) => n,
        Err(e) => return internal_error("Failed to count unsent messages", e),
    };
    (
        StatusCode::OK,
        Json(json!({
            "running": state.scheduler.is_running().await,
            "unsent": unsent,
            "uptime_secs": state.start_time.elapsed().as_secs(),
        })),
    )
}

/// All sent messages, most recent first.
pub async fn list_sent(State(state): State<Arc<AppState>>) -> ApiResponse {
    let messages = match state.store.list_sent().await {
        Ok(m) => m,
        Err(e) => return internal_error("Failed to retrieve sent messages", e),
    };
    match serde_json::to_value(&messages) {
        Ok(v) => (StatusCode::OK, Json(v)),
        Err(e) => internal_error("Failed to encode response", e),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub content: String,
}

/// Queue a new message for the next batches.
///
/// The body is decoded as JSON whatever the `Content-Type` header says.
pub async fn create_message(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResponse {
    let Ok(req) = serde_json::from_slice::<CreateMessageRequest>(&body) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid request payload",
            "Request body must be valid JSON",
            "INVALID_PAYLOAD",
        );
    };

    if !is_valid_phone(&req.to) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid phone number format",
            "Phone number must be in international format (e.g., +905551111111)",
            "INVALID_PHONE_NUMBER",
        );
    }
    if req.content.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Content cannot be empty",
            "Message content is required",
            "EMPTY_CONTENT",
        );
    }

    let new_message = match NewMessage::new(&req.to, &req.content, state.char_limit) {
        Ok(m) => m,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Validation failed",
                &e.to_string(),
                "VALIDATION_ERROR",
            );
        }
    };

    let message = match state.store.create(new_message).await {
        Ok(m) => m,
        Err(e) => return internal_error("Failed to create message in database", e),
    };
    tracing::info!(id = message.id, to = %message.to, "📝 Message queued");

    match serde_json::to_value(&message) {
        Ok(v) => (StatusCode::CREATED, Json(v)),
        Err(e) => internal_error("Failed to encode response", e),
    }
}
