//! Route handlers and response shapes

use super::AppState;
use crate::agent::TurnOutcome;
use crate::telemetry::{with_span, SpanKind};
use crate::QuipError;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Span name of a `/joke` request
pub const JOKE_SPAN: &str = "joke-request";

/// Span name of a `/feedback` request
pub const FEEDBACK_SPAN: &str = "feedback-request";

/// Query string of `/feedback`
#[derive(Debug, Default, Deserialize)]
pub struct FeedbackParams {
    pub reaction: Option<String>,
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
}

impl IntoResponse for TurnOutcome {
    fn into_response(self) -> Response {
        match self {
            TurnOutcome::Reply { text, thread_id } => (
                StatusCode::OK,
                Json(json!({ "message": text, "threadId": thread_id })),
            )
                .into_response(),
            TurnOutcome::RunFailed { details, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "The agent run failed", "details": details })),
            )
                .into_response(),
        }
    }
}

impl IntoResponse for QuipError {
    fn into_response(self) -> Response {
        match self {
            QuipError::InvalidInput { message } => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            other => {
                error!(kind = other.kind(), error = %other, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "Internal server error",
                        "msg": other.to_string(),
                    })),
                )
                    .into_response()
            }
        }
    }
}

/// `GET /joke`
pub async fn joke(State(state): State<AppState>) -> Result<TurnOutcome, QuipError> {
    let orchestrator = Arc::clone(&state.orchestrator);
    with_span(&state.tracer, JOKE_SPAN, SpanKind::Server, |span| async move {
        orchestrator.new_joke(&span).await
    })
    .await
}

/// `GET /feedback?reaction=..&threadId=..`
///
/// Missing parameters are rejected before a span is opened or the platform is
/// contacted.
pub async fn feedback(
    State(state): State<AppState>,
    Query(params): Query<FeedbackParams>,
) -> Result<TurnOutcome, QuipError> {
    let (reaction, thread_id) = match (params.reaction, params.thread_id) {
        (Some(reaction), Some(thread_id))
            if !reaction.trim().is_empty() && !thread_id.trim().is_empty() =>
        {
            (reaction, thread_id)
        }
        _ => {
            return Err(QuipError::invalid_input(
                "Both reaction and threadId query parameters are required",
            ))
        }
    };

    let orchestrator = Arc::clone(&state.orchestrator);
    with_span(&state.tracer, FEEDBACK_SPAN, SpanKind::Server, |span| async move {
        orchestrator.feedback(&span, &reaction, &thread_id).await
    })
    .await
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": state.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "telemetry": state.tracer.is_enabled(),
        "timestamp": chrono::Utc::now(),
    }))
}
