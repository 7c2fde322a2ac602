//! Session-scoped relay to the external AI streaming service.
//!
//! The relay forwards one JSON message upstream and republishes the raw
//! response bytes unmodified. It performs no interpretation of the payload;
//! the browser parses the newline-delimited JSON chunks itself.

pub mod history;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use log::error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::shared::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Pipes the upstream byte stream straight through. Any upstream failure
/// collapses to a generic 500 with a plain-text body; failures are terminal
/// for the request, with no retry. The configured deadline bounds a hung
/// upstream, and dropping the inbound connection drops the upstream request
/// with it.
async fn relay_chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Response {
    let upstream_url = format!("{}/stream", state.config.ai_server_url);

    let upstream = state
        .http
        .post(&upstream_url)
        .json(&payload)
        .timeout(state.config.relay_timeout)
        .send()
        .await;

    let response = match upstream {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            error!("AI upstream returned {}", response.status());
            return (StatusCode::INTERNAL_SERVER_ERROR, "Backend error").into_response();
        }
        Err(e) => {
            error!("AI upstream request failed: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Backend error").into_response();
        }
    };

    let stream = response.bytes_stream();
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(stream))
        .unwrap_or_else(|e| {
            error!("Failed to build relay response: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Backend error").into_response()
        })
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat", post(relay_chat))
        .merge(history::configure())
}
