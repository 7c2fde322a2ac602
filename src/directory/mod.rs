//! User directory and identity glue.
//!
//! The identity provider is an external collaborator; authenticated requests
//! arrive with identity headers set by the auth proxy. Accounts are
//! provisioned on first sight of an external id and the binding is immutable
//! afterwards.

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap},
    response::Json,
    routing::get,
    Router,
};
use chrono::Utc;
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::AppError;
use crate::shared::models::User;
use crate::shared::state::AppState;
use crate::shared::utils::{run_blocking, DbPool};
use crate::shared::UserRole;

pub const IDENTITY_ID_HEADER: &str = "x-identity-id";
pub const IDENTITY_EMAIL_HEADER: &str = "x-identity-email";
pub const IDENTITY_NAME_HEADER: &str = "x-identity-name";

/// Identity of the caller as asserted by the auth proxy.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub external_id: String,
    pub email: String,
    pub name: String,
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
        .filter(|value| !value.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let external_id = header_value(&parts.headers, IDENTITY_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("No authenticated identity".to_string()))?;
        let email = header_value(&parts.headers, IDENTITY_EMAIL_HEADER).unwrap_or_default();
        let name = header_value(&parts.headers, IDENTITY_NAME_HEADER).unwrap_or_default();
        Ok(AuthContext {
            external_id,
            email,
            name,
        })
    }
}

/// Get-or-create the account bound to an external identity.
pub async fn ensure_user(pool: &DbPool, auth: &AuthContext) -> Result<User, AppError> {
    let auth = auth.clone();
    run_blocking(pool, move |conn| ensure_user_blocking(conn, &auth)).await
}

pub fn ensure_user_blocking(conn: &mut PgConnection, auth: &AuthContext) -> Result<User, AppError> {
    use crate::shared::schema::users::dsl::*;

    if let Some(user) = users
        .filter(external_id.eq(&auth.external_id))
        .first::<User>(conn)
        .optional()?
    {
        return Ok(user);
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        external_id: auth.external_id.clone(),
        email: auth.email.clone(),
        name: auth.name.clone(),
        role: UserRole::Individual.as_str().to_string(),
        description: None,
        created_at: now,
        updated_at: now,
    };

    let created = diesel::insert_into(users).values(&user).get_result(conn)?;
    Ok(created)
}

async fn get_me(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
) -> Result<Json<User>, AppError> {
    let user = ensure_user(&state.conn, &auth).await?;
    Ok(Json(user))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new().route("/users/me", get(get_me))
}
