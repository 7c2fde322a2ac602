//! Project workspaces and the access check shared with the task service.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::directory::{ensure_user, AuthContext};
use crate::shared::error::AppError;
use crate::shared::models::Project;
use crate::shared::state::AppState;
use crate::shared::utils::run_blocking;
use crate::shared::ProjectStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub member_ids: Option<Vec<Uuid>>,
}

pub fn load_project(conn: &mut PgConnection, pid: Uuid) -> Result<Project, AppError> {
    use crate::shared::schema::projects::dsl::*;
    projects
        .filter(id.eq(pid))
        .first::<Project>(conn)
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("Project {} not found", pid)))
}

/// NotFound if the project is missing, Forbidden unless the caller is the
/// lead or a team member.
pub fn assert_access(conn: &mut PgConnection, pid: Uuid, user_id: Uuid) -> Result<Project, AppError> {
    let project = load_project(conn, pid)?;
    if !project.has_access(user_id) {
        return Err(AppError::Forbidden(format!(
            "No access to project {}",
            project.key
        )));
    }
    Ok(project)
}

pub fn parse_project_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::Validation(format!("Invalid project id: {}", raw)))
}

async fn create_project(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<Json<Project>, AppError> {
    if payload.key.trim().is_empty() {
        return Err(AppError::Validation("Project key must not be empty".to_string()));
    }
    let lead = ensure_user(&state.conn, &auth).await?;

    let project = run_blocking(&state.conn, move |conn| {
        use crate::shared::schema::projects::dsl::*;
        let now = Utc::now();
        let record = Project {
            id: Uuid::new_v4(),
            key: payload.key.trim().to_string(),
            name: payload.name,
            description: payload.description,
            status: ProjectStatus::Active.as_str().to_string(),
            lead_user_id: lead.id,
            member_ids: payload.member_ids.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        let created: Project = diesel::insert_into(projects)
            .values(&record)
            .get_result(conn)
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                ) => AppError::Validation(format!("Project key {} already exists", record.key)),
                other => other.into(),
            })?;
        Ok(created)
    })
    .await?;

    Ok(Json(project))
}

async fn get_project(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(raw_id): Path<String>,
) -> Result<Json<Project>, AppError> {
    let pid = parse_project_id(&raw_id)?;
    let user = ensure_user(&state.conn, &auth).await?;

    let project =
        run_blocking(&state.conn, move |conn| assert_access(conn, pid, user.id)).await?;
    Ok(Json(project))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects/create", post(create_project))
        .route("/projects/:id", get(get_project))
}
