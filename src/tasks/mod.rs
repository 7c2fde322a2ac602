//! Task RPC surface: mutations, board reads, dependencies, comments.

pub mod board;
pub mod editor;
pub mod engine;
pub mod types;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use log::info;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::directory::{ensure_user, AuthContext};
use crate::project::parse_project_id;
use crate::shared::error::AppError;
use crate::shared::models::TaskComment;
use crate::shared::state::AppState;
use crate::tasks::board::Board;
use crate::tasks::types::{
    AddCommentRequest, CreateTaskRequest, SubtaskStatusUpdate, TaskPatch, TaskResponse,
};

pub use engine::TaskEngine;

async fn handle_task_create(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<Json<TaskResponse>, AppError> {
    let user = ensure_user(&state.conn, &auth).await?;
    let task = state.task_engine.create(user.id, payload).await?;
    info!("Created task {} in project {}", task.key, task.project_id);
    Ok(Json(task.into()))
}

async fn handle_task_update(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<TaskPatch>,
) -> Result<Json<TaskResponse>, AppError> {
    let user = ensure_user(&state.conn, &auth).await?;
    let task = state.task_engine.update(user.id, id, payload).await?;
    Ok(Json(task.into()))
}

async fn handle_task_delete(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let user = ensure_user(&state.conn, &auth).await?;
    state.task_engine.delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_subtask_status(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubtaskStatusUpdate>,
) -> Result<Json<TaskResponse>, AppError> {
    let user = ensure_user(&state.conn, &auth).await?;
    let task = state
        .task_engine
        .update_subtask_status(user.id, id, payload.status)
        .await?;
    Ok(Json(task.into()))
}

#[derive(Debug, Deserialize)]
struct SetParentRequest {
    parent_task_id: Option<Uuid>,
}

async fn handle_set_parent(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetParentRequest>,
) -> Result<Json<TaskResponse>, AppError> {
    let user = ensure_user(&state.conn, &auth).await?;
    let task = state
        .task_engine
        .set_parent(user.id, id, payload.parent_task_id)
        .await?;
    Ok(Json(task.into()))
}

async fn handle_project_board(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(raw_id): Path<String>,
) -> Result<Json<Board>, AppError> {
    let project_id = parse_project_id(&raw_id)?;
    let user = ensure_user(&state.conn, &auth).await?;
    let board = state.task_engine.get_by_project(user.id, project_id).await?;
    Ok(Json(board))
}

async fn handle_add_dependency(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path((id, dep)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let user = ensure_user(&state.conn, &auth).await?;
    state.task_engine.add_dependency(user.id, id, dep).await?;
    Ok(StatusCode::CREATED)
}

async fn handle_remove_dependency(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path((id, dep)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let user = ensure_user(&state.conn, &auth).await?;
    state.task_engine.remove_dependency(user.id, id, dep).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_add_comment(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddCommentRequest>,
) -> Result<Json<TaskComment>, AppError> {
    let user = ensure_user(&state.conn, &auth).await?;
    let comment = state.task_engine.add_comment(user.id, id, payload).await?;
    Ok(Json(comment))
}

async fn handle_list_comments(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TaskComment>>, AppError> {
    let user = ensure_user(&state.conn, &auth).await?;
    let comments = state.task_engine.list_comments(user.id, id).await?;
    Ok(Json(comments))
}

/// Fixture dataset for seeding/demo; not part of the invariant surface.
async fn handle_board_mock() -> Json<Board> {
    Json(engine::board_fixture())
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tasks/create", post(handle_task_create))
        .route("/tasks/:id/update", put(handle_task_update))
        .route("/tasks/:id/delete", delete(handle_task_delete))
        .route("/tasks/:id/status", put(handle_subtask_status))
        .route("/tasks/:id/parent", put(handle_set_parent))
        .route(
            "/tasks/:id/dependencies/:dep",
            post(handle_add_dependency).delete(handle_remove_dependency),
        )
        .route(
            "/tasks/:id/comments",
            post(handle_add_comment).get(handle_list_comments),
        )
        .route("/projects/:id/tasks", get(handle_project_board))
        .route("/test-data/board", get(handle_board_mock))
}
