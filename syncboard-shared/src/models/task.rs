/// Task model and field-level types
///
/// This module provides the Task model, the central entity of Syncboard.
/// Tasks are created by one user, optionally assigned to another, and move
/// through a small status lifecycle while every change is fanned out to
/// connected clients.
///
/// # Status lifecycle
///
/// ```text
/// TODO → IN_PROGRESS → REVIEW → COMPLETED
/// ```
///
/// The lifecycle is permissive: any status may move directly to COMPLETED
/// or back to TODO, and COMPLETED tasks may be reopened. The service layer
/// validates only that a target status is one of the four known values.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'in_progress', 'review', 'completed');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high', 'urgent');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(200) NOT NULL,
///     description TEXT,
///     due_date TIMESTAMPTZ NOT NULL,
///     priority task_priority NOT NULL DEFAULT 'medium',
///     status task_status NOT NULL DEFAULT 'todo',
///     creator_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     assigned_to_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum allowed title length in characters.
pub const TITLE_MAX_LEN: usize = 200;

/// Task status
///
/// Serialized on the wire as the canonical uppercase form
/// (`TODO`, `IN_PROGRESS`, `REVIEW`, `COMPLETED`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Not started yet (the default for new tasks)
    Todo,

    /// Actively being worked on
    InProgress,

    /// Work finished, awaiting review
    Review,

    /// Done; may still be reopened
    Completed,
}

impl TaskStatus {
    /// Canonical wire representation of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Review => "REVIEW",
            TaskStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status value.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown task status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    /// Parses the canonical uppercase form only.
    ///
    /// Lowercase or mixed-case spellings are rejected; the wire contract
    /// standardizes on one representation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TODO" => Ok(TaskStatus::Todo),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "REVIEW" => Ok(TaskStatus::Review),
            "COMPLETED" => Ok(TaskStatus::Completed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Task priority
///
/// Declaration order doubles as sort order: LOW < MEDIUM < HIGH < URGENT.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_priority", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    /// Canonical wire representation of the priority
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
            TaskPriority::Urgent => "URGENT",
        }
    }
}

/// Error returned when parsing an unknown priority value.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown task priority: {0}")]
pub struct UnknownPriority(pub String);

impl FromStr for TaskPriority {
    type Err = UnknownPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(TaskPriority::Low),
            "MEDIUM" => Ok(TaskPriority::Medium),
            "HIGH" => Ok(TaskPriority::High),
            "URGENT" => Ok(TaskPriority::Urgent),
            other => Err(UnknownPriority(other.to_string())),
        }
    }
}

/// Task model
///
/// `creator_id` is immutable after creation; `assigned_to_id` is mutable and
/// optional (a task with no assignee is "unassigned" and excluded from
/// assignee-scoped queries). `updated_at` moves on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Short human-readable title (1..=200 characters)
    pub title: String,

    /// Optional longer description
    pub description: Option<String>,

    /// When the task is due
    pub due_date: DateTime<Utc>,

    /// Priority level
    pub priority: TaskPriority,

    /// Current lifecycle status
    pub status: TaskStatus,

    /// User who created the task (never changes)
    pub creator_id: Uuid,

    /// User the task is currently assigned to, if any
    pub assigned_to_id: Option<Uuid>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last mutated
    pub updated_at: DateTime<Utc>,
}

/// Store-level input for creating a task
///
/// The lifecycle service builds this after validation; the store only
/// persists it and stamps id/timestamps.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub creator_id: Uuid,
    pub assigned_to_id: Option<Uuid>,
}

/// Store-level partial update
///
/// Only `Some` fields are written; everything else is left unchanged
/// (partial update semantics, not replacement). Double-`Option` fields
/// distinguish "leave as-is" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub assigned_to_id: Option<Option<Uuid>>,
}

impl TaskChanges {
    /// True when no field is set; the store may skip the write entirely.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.assigned_to_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str() {
        assert_eq!(TaskStatus::Todo.as_str(), "TODO");
        assert_eq!(TaskStatus::InProgress.as_str(), "IN_PROGRESS");
        assert_eq!(TaskStatus::Review.as_str(), "REVIEW");
        assert_eq!(TaskStatus::Completed.as_str(), "COMPLETED");
    }

    #[test]
    fn test_status_parse_roundtrip() {
        for status in [
            TaskStatus::Todo,
            TaskStatus::InProgress,
            TaskStatus::Review,
            TaskStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_status_parse_rejects_unknown_and_noncanonical() {
        assert!("DONE".parse::<TaskStatus>().is_err());
        assert!("".parse::<TaskStatus>().is_err());
        // The source system had inconsistent casing; only the canonical
        // uppercase form is accepted here.
        assert!("ToDo".parse::<TaskStatus>().is_err());
        assert!("completed".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_priority_ordering_follows_declaration() {
        assert!(TaskPriority::Low < TaskPriority::Medium);
        assert!(TaskPriority::Medium < TaskPriority::High);
        assert!(TaskPriority::High < TaskPriority::Urgent);
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("URGENT".parse::<TaskPriority>().unwrap(), TaskPriority::Urgent);
        assert!("CRITICAL".parse::<TaskPriority>().is_err());
    }

    #[test]
    fn test_task_wire_serialization_is_camel_case() {
        let task = Task {
            id: Uuid::new_v4(),
            title: "Write release notes".to_string(),
            description: None,
            due_date: Utc::now(),
            priority: TaskPriority::High,
            status: TaskStatus::InProgress,
            creator_id: Uuid::new_v4(),
            assigned_to_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains("\"dueDate\""));
        assert!(json.contains("\"assignedToId\""));
        assert!(json.contains("\"IN_PROGRESS\""));
        assert!(json.contains("\"HIGH\""));
    }

    #[test]
    fn test_task_changes_is_empty() {
        assert!(TaskChanges::default().is_empty());

        let changes = TaskChanges {
            title: Some("New title".to_string()),
            ..Default::default()
        };
        assert!(!changes.is_empty());

        // Clearing a field still counts as a change.
        let clear_assignee = TaskChanges {
            assigned_to_id: Some(None),
            ..Default::default()
        };
        assert!(!clear_assignee.is_empty());
    }
}
