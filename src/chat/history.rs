//! Append-only chat message log, keyed by the session cookie.

use axum::{
    extract::State,
    response::Json,
    routing::get,
    Router,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::directory::{ensure_user, AuthContext};
use crate::session::current_session_id;
use crate::shared::error::AppError;
use crate::shared::models::ChatMessage;
use crate::shared::state::AppState;
use crate::shared::utils::run_blocking;
use crate::shared::ChatRole;

/// Onboarding stages run 1 through 9.
pub fn validate_stage(stage: i32) -> Result<(), AppError> {
    if (1..=9).contains(&stage) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Stage {} outside valid range 1-9",
            stage
        )))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendMessageRequest {
    pub role: String,
    pub content: String,
    pub metadata: Option<serde_json::Value>,
    pub stage: i32,
}

async fn append_message(
    State(state): State<Arc<AppState>>,
    auth: Option<AuthContext>,
    cookies: Cookies,
    Json(payload): Json<AppendMessageRequest>,
) -> Result<Json<ChatMessage>, AppError> {
    validate_stage(payload.stage)?;
    let message_role = ChatRole::parse(&payload.role)?;
    let session_id = current_session_id(&cookies)
        .ok_or_else(|| AppError::Validation("No session cookie".to_string()))?;

    let user_id = match &auth {
        Some(auth) => Some(ensure_user(&state.conn, auth).await?.id),
        None => None,
    };

    let message = run_blocking(&state.conn, move |conn| {
        use crate::shared::schema::chat_messages::dsl::chat_messages;
        let record = ChatMessage {
            id: Uuid::new_v4(),
            session_id,
            user_id,
            role: message_role.as_str().to_string(),
            content: payload.content,
            metadata: payload.metadata,
            stage: payload.stage,
            created_at: Utc::now(),
        };
        let created = diesel::insert_into(chat_messages)
            .values(&record)
            .get_result(conn)?;
        Ok(created)
    })
    .await?;

    Ok(Json(message))
}

async fn list_messages(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    let current = match current_session_id(&cookies) {
        Some(session) => session,
        None => return Ok(Json(vec![])),
    };

    let messages = run_blocking(&state.conn, move |conn| {
        use crate::shared::schema::chat_messages::dsl::*;
        let rows = chat_messages
            .filter(session_id.eq(&current))
            .order(created_at.asc())
            .load::<ChatMessage>(conn)?;
        Ok(rows)
    })
    .await?;

    Ok(Json(messages))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new().route("/chat/history", get(list_messages).post(append_message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_bounds() {
        assert!(validate_stage(1).is_ok());
        assert!(validate_stage(9).is_ok());
        assert!(validate_stage(0).is_err());
        assert!(validate_stage(10).is_err());
        assert!(validate_stage(-3).is_err());
    }
}
