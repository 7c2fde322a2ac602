//! Closed string sets stored in Text columns.
//!
//! Columns stay `Text` and row structs carry `String`; these enums are the
//! validation boundary for the fixed sets the API accepts.

use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Backlog,
    Todo,
    InProgress,
    Done,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "backlog" => Ok(Self::Backlog),
            "todo" => Ok(Self::Todo),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(AppError::Validation(format!(
                "Unknown task status: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Individual,
    Investor,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Investor => "investor",
            Self::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Inactive,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Archived => "archived",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            other => Err(AppError::Validation(format!("Unknown chat role: {}", other))),
        }
    }
}

/// Marker distinguishing AI-created tasks from user-created ones.
/// AI-generated tasks are not deletable through the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratedBy {
    User,
    Ai,
}

impl GeneratedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
        }
    }
}

/// Storage keeps priorities capitalized (Low/Medium/High); editing surfaces
/// use the lowercase form. Unknown values pass through unchanged since the
/// column is free-form.
pub fn priority_to_storage(value: &str) -> String {
    match value {
        "low" => "Low".to_string(),
        "medium" => "Medium".to_string(),
        "high" => "High".to_string(),
        other => other.to_string(),
    }
}

pub fn priority_to_editing(value: &str) -> String {
    match value {
        "Low" => "low".to_string(),
        "Medium" => "medium".to_string(),
        "High" => "high".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        for s in [
            TaskStatus::Backlog,
            TaskStatus::Todo,
            TaskStatus::InProgress,
            TaskStatus::Done,
            TaskStatus::Cancelled,
        ] {
            assert_eq!(TaskStatus::parse(s.as_str()).unwrap(), s);
        }
    }

    #[test]
    fn status_rejects_unknown() {
        assert!(TaskStatus::parse("paused").is_err());
        assert!(TaskStatus::parse("Todo").is_err());
    }

    #[test]
    fn priority_normalization_both_directions() {
        assert_eq!(priority_to_storage("low"), "Low");
        assert_eq!(priority_to_storage("medium"), "Medium");
        assert_eq!(priority_to_storage("high"), "High");
        assert_eq!(priority_to_editing("High"), "high");
        assert_eq!(priority_to_editing("Medium"), "medium");
        assert_eq!(priority_to_editing("Low"), "low");
    }

    #[test]
    fn priority_free_form_passes_through() {
        assert_eq!(priority_to_storage("Critical"), "Critical");
        assert_eq!(priority_to_editing("Critical"), "Critical");
    }
}
