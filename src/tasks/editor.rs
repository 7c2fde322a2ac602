//! Reconciliation state for the task detail editor.
//!
//! Buffers local edits against the last-known-saved task, reports a dirty
//! flag only when they diverge by value, and produces the full-record patch
//! a save commits. No I/O happens here; the caller owns the round trip.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::shared::enums::{priority_to_editing, TaskStatus};
use crate::shared::models::Task;
use crate::tasks::types::TaskPatch;

/// The editable field set, held in the editing representation: priority
/// lowercase, description as a plain string where empty means none.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorFields {
    pub title: String,
    pub status: TaskStatus,
    pub priority: String,
    pub due_date: Option<DateTime<Utc>>,
    pub description: String,
}

impl EditorFields {
    fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            status: TaskStatus::parse(&task.status).unwrap_or(TaskStatus::Backlog),
            priority: priority_to_editing(&task.priority),
            due_date: task.due_date,
            description: task.description.clone().unwrap_or_default(),
        }
    }
}

/// Outcome of loading a task into the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Clean,
    /// Unsaved local edits were discarded by the load. Callers that want a
    /// confirmation prompt should check `is_dirty` before calling `load`.
    DiscardedEdits,
}

#[derive(Debug, Clone)]
pub struct TaskEditor {
    task_id: Uuid,
    deletable: bool,
    saved: EditorFields,
    local: EditorFields,
}

impl TaskEditor {
    pub fn new(task: &Task) -> Self {
        let fields = EditorFields::from_task(task);
        Self {
            task_id: task.id,
            deletable: task.generated_by != "ai",
            saved: fields.clone(),
            local: fields,
        }
    }

    /// Resets all local fields from the incoming record, regardless of
    /// dirty state.
    pub fn load(&mut self, task: &Task) -> LoadOutcome {
        let outcome = if self.is_dirty() {
            LoadOutcome::DiscardedEdits
        } else {
            LoadOutcome::Clean
        };
        self.task_id = task.id;
        self.deletable = task.generated_by != "ai";
        self.saved = EditorFields::from_task(task);
        self.local = self.saved.clone();
        outcome
    }

    pub fn task_id(&self) -> Uuid {
        self.task_id
    }

    /// Whether the delete affordance is offered at all; the service enforces
    /// the same rule authoritatively.
    pub fn deletable(&self) -> bool {
        self.deletable
    }

    pub fn fields(&self) -> &EditorFields {
        &self.local
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.local.title = title.into();
    }

    pub fn set_status(&mut self, status: TaskStatus) {
        self.local.status = status;
    }

    pub fn set_priority(&mut self, priority: impl Into<String>) {
        self.local.priority = priority.into();
    }

    pub fn set_due_date(&mut self, due_date: Option<DateTime<Utc>>) {
        self.local.due_date = due_date;
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.local.description = description.into();
    }

    /// Value diff over the full editable set. Due dates compare on the
    /// underlying instant.
    pub fn is_dirty(&self) -> bool {
        self.local != self.saved
    }

    /// Full editable field set for an atomic save. A blanked title falls
    /// back to the saved one; an empty description is sent as an explicit
    /// null so the server clears the field.
    pub fn save_payload(&self) -> TaskPatch {
        let title = if self.local.title.trim().is_empty() {
            self.saved.title.clone()
        } else {
            self.local.title.clone()
        };
        let description = if self.local.description.is_empty() {
            None
        } else {
            Some(self.local.description.clone())
        };
        TaskPatch {
            title: Some(title),
            status: Some(self.local.status.as_str().to_string()),
            description: Some(description),
            priority: Some(self.local.priority.clone()),
            due_date: Some(self.local.due_date),
        }
    }

    /// On save success: local state becomes exactly what was sent, with no
    /// refetch, so server-side echo differences cannot flicker the editor.
    pub fn mark_saved(&mut self, sent: &TaskPatch) {
        if let Some(title) = &sent.title {
            self.saved.title = title.clone();
        }
        if let Some(status) = &sent.status {
            if let Ok(parsed) = TaskStatus::parse(status) {
                self.saved.status = parsed;
            }
        }
        if let Some(description) = &sent.description {
            self.saved.description = description.clone().unwrap_or_default();
        }
        if let Some(priority) = &sent.priority {
            self.saved.priority = priority.clone();
        }
        if let Some(due_date) = &sent.due_date {
            self.saved.due_date = *due_date;
        }
        self.local = self.saved.clone();
    }

    /// Discards local edits, returning to the last-known-saved values.
    pub fn cancel(&mut self) {
        self.local = self.saved.clone();
    }
}
