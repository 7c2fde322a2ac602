//! Task engine - core task management logic.

use chrono::Utc;
use diesel::prelude::*;
use std::collections::HashMap;
use uuid::Uuid;

use crate::project::assert_access;
use crate::shared::enums::{priority_to_storage, GeneratedBy, TaskStatus};
use crate::shared::error::AppError;
use crate::shared::models::{Task, TaskComment, TaskDependency};
use crate::shared::utils::{run_blocking, DbPool};
use crate::tasks::board::{self, parent_chain_has_cycle, Board, DependencyGraph};
use crate::tasks::types::{AddCommentRequest, CreateTaskRequest, TaskPatch};

#[derive(Clone)]
pub struct TaskEngine {
    conn: DbPool,
}

impl TaskEngine {
    pub fn new(conn: DbPool) -> Self {
        Self { conn }
    }

    pub async fn create(&self, caller: Uuid, request: CreateTaskRequest) -> Result<Task, AppError> {
        run_blocking(&self.conn, move |conn| create_blocking(conn, caller, request)).await
    }

    /// Partial update. Only supplied fields are mutated; explicit nulls on
    /// description and due date clear them. Priority is normalized from the
    /// editing form to the storage form here, not by the caller.
    pub async fn update(
        &self,
        caller: Uuid,
        task_id: Uuid,
        patch: TaskPatch,
    ) -> Result<Task, AppError> {
        run_blocking(&self.conn, move |conn| {
            update_blocking(conn, caller, task_id, patch)
        })
        .await
    }

    /// Hard delete. AI-generated tasks are rejected here, not just at the
    /// edit surface.
    pub async fn delete(&self, caller: Uuid, task_id: Uuid) -> Result<(), AppError> {
        run_blocking(&self.conn, move |conn| delete_blocking(conn, caller, task_id)).await
    }

    /// Status-only fast path for inline subtask edits.
    pub async fn update_subtask_status(
        &self,
        caller: Uuid,
        task_id: Uuid,
        status: String,
    ) -> Result<Task, AppError> {
        let patch = TaskPatch {
            status: Some(status),
            ..TaskPatch::default()
        };
        self.update(caller, task_id, patch).await
    }

    pub async fn get_by_project(&self, caller: Uuid, project_id: Uuid) -> Result<Board, AppError> {
        run_blocking(&self.conn, move |conn| {
            board_blocking(conn, caller, project_id)
        })
        .await
    }

    pub async fn add_dependency(
        &self,
        caller: Uuid,
        task_id: Uuid,
        depends_on: Uuid,
    ) -> Result<(), AppError> {
        run_blocking(&self.conn, move |conn| {
            add_dependency_blocking(conn, caller, task_id, depends_on)
        })
        .await
    }

    pub async fn remove_dependency(
        &self,
        caller: Uuid,
        task: Uuid,
        depends_on: Uuid,
    ) -> Result<(), AppError> {
        run_blocking(&self.conn, move |conn| {
            use crate::shared::schema::task_dependencies::dsl::*;
            let found = load_task(conn, task)?;
            assert_access(conn, found.project_id, caller)?;
            diesel::delete(
                task_dependencies
                    .filter(task_id.eq(task))
                    .filter(depends_on_task_id.eq(depends_on)),
            )
            .execute(conn)?;
            Ok(())
        })
        .await
    }

    /// Re-parent a task (or detach it with `None`). The parent must exist
    /// in the same project and must not close a parent-chain cycle.
    pub async fn set_parent(
        &self,
        caller: Uuid,
        task: Uuid,
        parent: Option<Uuid>,
    ) -> Result<Task, AppError> {
        run_blocking(&self.conn, move |conn| {
            use crate::shared::schema::tasks::dsl::*;
            let current = load_task(conn, task)?;
            assert_access(conn, current.project_id, caller)?;
            if let Some(candidate) = parent {
                validate_parent(conn, &current, candidate)?;
            }
            let updated = diesel::update(tasks.filter(id.eq(task)))
                .set((parent_task_id.eq(parent), updated_at.eq(Utc::now())))
                .get_result(conn)?;
            Ok(updated)
        })
        .await
    }

    pub async fn add_comment(
        &self,
        caller: Uuid,
        task: Uuid,
        request: AddCommentRequest,
    ) -> Result<TaskComment, AppError> {
        run_blocking(&self.conn, move |conn| {
            use crate::shared::schema::task_comments::dsl::*;
            let found = load_task(conn, task)?;
            assert_access(conn, found.project_id, caller)?;

            let comment_role = request.role.unwrap_or_else(|| "user".to_string());
            if comment_role != "user" && comment_role != "ai" {
                return Err(AppError::Validation(format!(
                    "Unknown comment role: {}",
                    comment_role
                )));
            }
            let now = Utc::now();
            let comment = TaskComment {
                id: Uuid::new_v4(),
                task_id: task,
                author_id: caller,
                role: comment_role,
                body: request.body,
                created_at: now,
                updated_at: now,
            };
            let created = diesel::insert_into(task_comments)
                .values(&comment)
                .get_result(conn)?;
            Ok(created)
        })
        .await
    }

    pub async fn list_comments(&self, caller: Uuid, task: Uuid) -> Result<Vec<TaskComment>, AppError> {
        run_blocking(&self.conn, move |conn| {
            use crate::shared::schema::task_comments::dsl::*;
            let found = load_task(conn, task)?;
            assert_access(conn, found.project_id, caller)?;
            let comments = task_comments
                .filter(task_id.eq(task))
                .order(created_at.asc())
                .load::<TaskComment>(conn)?;
            Ok(comments)
        })
        .await
    }
}

pub fn load_task(conn: &mut PgConnection, tid: Uuid) -> Result<Task, AppError> {
    use crate::shared::schema::tasks::dsl::*;
    tasks
        .filter(id.eq(tid))
        .first::<Task>(conn)
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("Task {} not found", tid)))
}

fn next_task_key(conn: &mut PgConnection, pid: Uuid, project_key: &str) -> Result<String, AppError> {
    use crate::shared::schema::tasks::dsl::*;
    let keys: Vec<String> = tasks
        .filter(project_id.eq(pid))
        .select(key)
        .load::<String>(conn)?;
    let next = keys
        .iter()
        .filter_map(|k| k.rsplit('-').next().and_then(|n| n.parse::<u64>().ok()))
        .max()
        .unwrap_or(0)
        + 1;
    Ok(format!("{}-{}", project_key, next))
}

fn create_blocking(
    conn: &mut PgConnection,
    caller: Uuid,
    request: CreateTaskRequest,
) -> Result<Task, AppError> {
    use crate::shared::schema::tasks::dsl::*;

    if request.title.trim().is_empty() {
        return Err(AppError::Validation("Task title must not be empty".to_string()));
    }
    let project = assert_access(conn, request.project_id, caller)?;

    if let Some(parent) = request.parent_task_id {
        let parent_task = load_task(conn, parent)?;
        if parent_task.project_id != project.id {
            return Err(AppError::Validation(
                "Parent task must belong to the same project".to_string(),
            ));
        }
    }

    let origin = match request.generated_by.as_deref() {
        None | Some("user") => GeneratedBy::User,
        Some("ai") => GeneratedBy::Ai,
        Some(other) => {
            return Err(AppError::Validation(format!(
                "Unknown generated_by marker: {}",
                other
            )))
        }
    };

    let now = Utc::now();
    let task = Task {
        id: Uuid::new_v4(),
        project_id: project.id,
        key: next_task_key(conn, project.id, &project.key)?,
        title: request.title.trim().to_string(),
        description: request.description,
        status: TaskStatus::Backlog.as_str().to_string(),
        priority: priority_to_storage(request.priority.as_deref().unwrap_or("medium")),
        assignee_id: request.assignee_id,
        reporter_id: Some(caller),
        parent_task_id: request.parent_task_id,
        due_date: request.due_date,
        generated_by: origin.as_str().to_string(),
        created_at: now,
        updated_at: now,
    };

    let created = diesel::insert_into(tasks).values(&task).get_result(conn)?;
    Ok(created)
}

/// The merged field set a patch resolves to against the stored task.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedFields {
    pub title: String,
    pub status: String,
    pub priority: String,
    pub description: Option<String>,
    pub due_date: Option<chrono::DateTime<Utc>>,
}

/// Resolves a partial update: only supplied fields change, explicit nulls
/// clear, and priority crosses from the editing form to the storage form.
pub fn apply_patch(current: &Task, patch: TaskPatch) -> Result<MergedFields, AppError> {
    let title = match patch.title {
        Some(t) if t.trim().is_empty() => {
            return Err(AppError::Validation("Task title must not be empty".to_string()))
        }
        Some(t) => t,
        None => current.title.clone(),
    };
    let status = match patch.status {
        Some(s) => TaskStatus::parse(&s)?.as_str().to_string(),
        None => current.status.clone(),
    };
    let priority = match patch.priority {
        Some(p) => priority_to_storage(&p),
        None => current.priority.clone(),
    };
    Ok(MergedFields {
        title,
        status,
        priority,
        description: patch.description.unwrap_or_else(|| current.description.clone()),
        due_date: patch.due_date.unwrap_or(current.due_date),
    })
}

fn update_blocking(
    conn: &mut PgConnection,
    caller: Uuid,
    tid: Uuid,
    patch: TaskPatch,
) -> Result<Task, AppError> {
    use crate::shared::schema::tasks::dsl::*;

    let current = load_task(conn, tid)?;
    assert_access(conn, current.project_id, caller)?;
    let merged = apply_patch(&current, patch)?;

    let updated = diesel::update(tasks.filter(id.eq(tid)))
        .set((
            title.eq(merged.title),
            status.eq(merged.status),
            priority.eq(merged.priority),
            description.eq(merged.description),
            due_date.eq(merged.due_date),
            updated_at.eq(Utc::now()),
        ))
        .get_result(conn)?;
    Ok(updated)
}

/// The generated-by marker makes AI tasks non-deletable; enforced here so
/// client-side button visibility is never the only guard.
pub fn ensure_deletable(task: &Task) -> Result<(), AppError> {
    if task.generated_by == GeneratedBy::Ai.as_str() {
        return Err(AppError::Forbidden(
            "AI-generated tasks cannot be deleted".to_string(),
        ));
    }
    Ok(())
}

fn delete_blocking(conn: &mut PgConnection, caller: Uuid, tid: Uuid) -> Result<(), AppError> {
    use crate::shared::schema::tasks::dsl::*;

    let current = load_task(conn, tid)?;
    assert_access(conn, current.project_id, caller)?;
    ensure_deletable(&current)?;

    diesel::delete(tasks.filter(id.eq(tid))).execute(conn)?;
    Ok(())
}

fn board_blocking(conn: &mut PgConnection, caller: Uuid, pid: Uuid) -> Result<Board, AppError> {
    assert_access(conn, pid, caller)?;

    let project_tasks = {
        use crate::shared::schema::tasks::dsl::*;
        tasks
            .filter(project_id.eq(pid))
            .order(created_at.asc())
            .load::<Task>(conn)?
    };
    let ids: Vec<Uuid> = project_tasks.iter().map(|t| t.id).collect();
    let edges = {
        use crate::shared::schema::task_dependencies::dsl::*;
        task_dependencies
            .filter(task_id.eq_any(&ids))
            .load::<TaskDependency>(conn)?
    };

    Ok(board::assemble(project_tasks, edges))
}

fn add_dependency_blocking(
    conn: &mut PgConnection,
    caller: Uuid,
    tid: Uuid,
    depends_on: Uuid,
) -> Result<(), AppError> {
    use crate::shared::schema::task_dependencies::dsl::*;

    let from_task = load_task(conn, tid)?;
    load_task(conn, depends_on)?;
    assert_access(conn, from_task.project_id, caller)?;

    let existing: Vec<TaskDependency> = task_dependencies.load::<TaskDependency>(conn)?;
    let graph = DependencyGraph::from_edges(
        existing
            .iter()
            .map(|d| (d.task_id, d.depends_on_task_id)),
    );
    if graph.would_create_cycle(tid, depends_on) {
        return Err(AppError::Validation(
            "Dependency would create a cycle".to_string(),
        ));
    }

    diesel::insert_into(task_dependencies)
        .values(&TaskDependency {
            task_id: tid,
            depends_on_task_id: depends_on,
            created_at: Utc::now(),
        })
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(())
}

/// Re-parenting goes through the same acyclicity rule as dependencies.
pub fn validate_parent(
    conn: &mut PgConnection,
    child: &Task,
    candidate_parent: Uuid,
) -> Result<(), AppError> {
    use crate::shared::schema::tasks::dsl::*;

    let rows: Vec<(Uuid, Option<Uuid>)> = tasks
        .filter(project_id.eq(child.project_id))
        .select((id, parent_task_id))
        .load(conn)?;
    let parents: HashMap<Uuid, Option<Uuid>> = rows.into_iter().collect();

    if !parents.contains_key(&candidate_parent) {
        return Err(AppError::Validation(
            "Parent task must belong to the same project".to_string(),
        ));
    }
    if parent_chain_has_cycle(&parents, child.id, candidate_parent) {
        return Err(AppError::Validation(
            "Parent assignment would create a cycle".to_string(),
        ));
    }
    Ok(())
}

/// Deterministic fixture dataset consumed by the test-data route.
pub fn board_fixture() -> Board {
    let project = Uuid::from_u128(0x5150_0001);
    let launch = Uuid::from_u128(0x5150_0010);
    let landing = Uuid::from_u128(0x5150_0011);
    let outreach = Uuid::from_u128(0x5150_0012);
    let pitch = Uuid::from_u128(0x5150_0020);

    let base = chrono::DateTime::parse_from_rfc3339("2026-01-05T09:00:00Z")
        .expect("fixture timestamp")
        .with_timezone(&Utc);
    let mk = |id: Uuid, n: u64, task_title: &str, parent: Option<Uuid>, origin: &str| Task {
        id,
        project_id: project,
        key: format!("SP-{}", n),
        title: task_title.to_string(),
        description: None,
        status: TaskStatus::Todo.as_str().to_string(),
        priority: "Medium".to_string(),
        assignee_id: None,
        reporter_id: None,
        parent_task_id: parent,
        due_date: None,
        generated_by: origin.to_string(),
        created_at: base + chrono::Duration::minutes(n as i64),
        updated_at: base + chrono::Duration::minutes(n as i64),
    };

    let tasks = vec![
        mk(launch, 1, "Prepare launch", None, "user"),
        mk(landing, 2, "Draft landing page", Some(launch), "ai"),
        mk(outreach, 3, "Plan outreach", Some(launch), "ai"),
        mk(pitch, 4, "Write investor pitch", None, "user"),
    ];
    let deps = vec![TaskDependency {
        task_id: pitch,
        depends_on_task_id: launch,
        created_at: base,
    }];
    board::assemble(tasks, deps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_task() -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            key: "SP-7".to_string(),
            title: "Ship beta".to_string(),
            description: Some("notes".to_string()),
            status: "todo".to_string(),
            priority: "High".to_string(),
            assignee_id: None,
            reporter_id: None,
            parent_task_id: None,
            due_date: Some(now),
            generated_by: "user".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn status_only_patch_leaves_other_fields() {
        let current = stored_task();
        let patch: TaskPatch = serde_json::from_str(r#"{"status": "in_progress"}"#).unwrap();
        let merged = apply_patch(&current, patch).unwrap();

        assert_eq!(merged.status, "in_progress");
        assert_eq!(merged.title, current.title);
        assert_eq!(merged.priority, current.priority);
        assert_eq!(merged.description, current.description);
        assert_eq!(merged.due_date, current.due_date);
    }

    #[test]
    fn explicit_null_clears_omitted_leaves() {
        let current = stored_task();

        let patch: TaskPatch = serde_json::from_str(r#"{"description": null}"#).unwrap();
        let merged = apply_patch(&current, patch).unwrap();
        assert_eq!(merged.description, None);

        let patch: TaskPatch = serde_json::from_str(r#"{"title": "New"}"#).unwrap();
        let merged = apply_patch(&current, patch).unwrap();
        assert_eq!(merged.description, Some("notes".to_string()));
    }

    #[test]
    fn due_date_null_clears() {
        let current = stored_task();
        let patch: TaskPatch = serde_json::from_str(r#"{"dueDate": null}"#).unwrap();
        let merged = apply_patch(&current, patch).unwrap();
        assert_eq!(merged.due_date, None);
    }

    #[test]
    fn priority_normalized_to_storage_form() {
        let current = stored_task();
        let patch: TaskPatch = serde_json::from_str(r#"{"priority": "medium"}"#).unwrap();
        let merged = apply_patch(&current, patch).unwrap();
        assert_eq!(merged.priority, "Medium");
    }

    #[test]
    fn unknown_status_rejected() {
        let current = stored_task();
        let patch: TaskPatch = serde_json::from_str(r#"{"status": "paused"}"#).unwrap();
        assert!(apply_patch(&current, patch).is_err());
    }

    #[test]
    fn blank_title_rejected() {
        let current = stored_task();
        let patch: TaskPatch = serde_json::from_str(r#"{"title": "  "}"#).unwrap();
        assert!(apply_patch(&current, patch).is_err());
    }

    #[test]
    fn ai_generated_tasks_rejected_at_delete() {
        let mut task = stored_task();
        task.generated_by = "ai".to_string();
        assert!(matches!(
            ensure_deletable(&task),
            Err(AppError::Forbidden(_))
        ));

        task.generated_by = "user".to_string();
        assert!(ensure_deletable(&task).is_ok());
    }

    #[test]
    fn fixture_is_deterministic() {
        let a = board_fixture();
        let b = board_fixture();
        assert_eq!(
            serde_json::to_value(&a).unwrap(),
            serde_json::to_value(&b).unwrap()
        );
    }

    #[test]
    fn fixture_nests_subtasks() {
        let board = board_fixture();
        assert_eq!(board.entries.len(), 2);
        assert_eq!(board.entries[0].subtasks.len(), 2);
        assert!(board.entries[1].subtasks.is_empty());
        assert_eq!(board.dependencies.len(), 1);
    }
}
