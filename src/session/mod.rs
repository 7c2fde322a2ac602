//! Session identity and idea-state persistence.
//!
//! A session is a cookie-issued random identifier; the external AI service
//! keeps its working memory for that session in the `idea_states` row keyed
//! by it. Clearing a session reissues the identifier and purges the rows
//! stored under the old one.

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_cookies::cookie::time::Duration;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::shared::error::AppError;
use crate::shared::models::IdeaState;
use crate::shared::state::AppState;
use crate::shared::utils::run_blocking;

pub const SESSION_COOKIE: &str = "sprint-planner-session-id";

const SESSION_MAX_AGE_DAYS: i64 = 5 * 365;

pub fn mint_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Long-lived, non-http-only so the browser client can read it, Lax to
/// survive top-level navigation from the identity provider.
pub fn build_session_cookie(session_id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(false)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::days(SESSION_MAX_AGE_DAYS))
        .build()
}

pub fn current_session_id(cookies: &Cookies) -> Option<String> {
    cookies
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

/// Returns the current session id, minting and setting the cookie when the
/// request carries none.
pub fn get_or_mint(cookies: &Cookies, secure: bool) -> String {
    if let Some(existing) = current_session_id(cookies) {
        return existing;
    }
    let session_id = mint_session_id();
    cookies.add(build_session_cookie(session_id.clone(), secure));
    session_id
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearSessionResponse {
    pub success: bool,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub message: String,
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
) -> Json<SessionInfo> {
    let session_id = get_or_mint(&cookies, state.config.secure_cookies);
    Json(SessionInfo { session_id })
}

async fn get_idea_state(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
) -> Result<Json<serde_json::Value>, AppError> {
    let current = match current_session_id(&cookies) {
        Some(session) => session,
        None => return Ok(Json(serde_json::Value::Null)),
    };

    let found = run_blocking(&state.conn, move |conn| {
        use crate::shared::schema::idea_states::dsl::*;
        let row = idea_states
            .filter(session_id.eq(&current))
            .first::<IdeaState>(conn)
            .optional()?;
        Ok(row)
    })
    .await?;

    Ok(Json(
        found.map(|row| row.state).unwrap_or(serde_json::Value::Null),
    ))
}

async fn put_idea_state(
    State(app): State<Arc<AppState>>,
    cookies: Cookies,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, AppError> {
    let current = get_or_mint(&cookies, app.config.secure_cookies);

    let stored = run_blocking(&app.conn, move |conn| {
        use crate::shared::schema::idea_states::dsl::*;
        let now = Utc::now();
        let row = IdeaState {
            session_id: current,
            state: payload,
            created_at: now,
            updated_at: now,
        };
        let upserted: IdeaState = diesel::insert_into(idea_states)
            .values(&row)
            .on_conflict(session_id)
            .do_update()
            .set((state.eq(&row.state), updated_at.eq(now)))
            .get_result(conn)?;
        Ok(upserted)
    })
    .await?;

    Ok(Json(stored.state))
}

/// Deletes the cookie and mints a replacement id. The rows stored under the
/// old id are purged rather than left orphaned.
async fn clear_session(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
) -> Result<Json<ClearSessionResponse>, AppError> {
    if let Some(old_id) = current_session_id(&cookies) {
        run_blocking(&state.conn, move |conn| purge_session(conn, &old_id)).await?;
    }

    cookies.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    let session_id = mint_session_id();
    cookies.add(build_session_cookie(
        session_id.clone(),
        state.config.secure_cookies,
    ));
    info!("Session cleared, reissued {}", session_id);

    Ok(Json(ClearSessionResponse {
        success: true,
        session_id,
        message: "Session cleared".to_string(),
    }))
}

pub fn purge_session(conn: &mut PgConnection, old_id: &str) -> Result<(), AppError> {
    {
        use crate::shared::schema::idea_states::dsl::*;
        diesel::delete(idea_states.filter(session_id.eq(old_id))).execute(conn)?;
    }
    {
        use crate::shared::schema::chat_messages::dsl::*;
        diesel::delete(chat_messages.filter(session_id.eq(old_id))).execute(conn)?;
    }
    Ok(())
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/session", get(get_session))
        .route("/session/state", get(get_idea_state).put(put_idea_state))
        .route("/session/clear", post(clear_session))
}
