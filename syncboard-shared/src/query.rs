/// Query filter builder
///
/// Translates a structured list-request filter into a [`TaskPredicate`] plus
/// a [`TaskSort`], the two values the store consumes. The predicate is a
/// structured conjunction rather than a closure so that the Postgres store
/// can compile it to a WHERE clause while the in-memory store evaluates it
/// directly with [`TaskPredicate::matches`].
///
/// # View scopes
///
/// The base visibility clause depends on the requested view:
///
/// - `my`: creator == current user OR assignee == current user. Any supplied
///   `assigned_to`/`created_by` narrowing is dropped - the view wins.
/// - `assigned`: assignee == current user, overriding any supplied
///   `assigned_to`.
/// - `all`: no creator/assignee restriction; explicit `assigned_to` and
///   `created_by` filters apply as given.
///
/// Every other clause (search, status, priority, overdue) is ANDed into one
/// conjunctive group with the visibility clause.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::task::{Task, TaskPriority, TaskStatus};

/// Named query mode determining the base visibility predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewScope {
    /// Tasks the current user created or is assigned to
    #[default]
    My,

    /// Tasks assigned to the current user
    Assigned,

    /// Every task, tenant-wide
    All,
}

impl ViewScope {
    /// Parses a view name (`"my"`, `"assigned"`, `"all"`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "my" => Some(ViewScope::My),
            "assigned" => Some(ViewScope::Assigned),
            "all" => Some(ViewScope::All),
            _ => None,
        }
    }
}

/// Sort order for task listings.
///
/// Priority comparisons follow declaration order: LOW < MEDIUM < HIGH < URGENT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskSort {
    /// Earliest due date first (the default)
    #[default]
    DueDateAsc,

    /// Latest due date first
    DueDateDesc,

    /// Lowest priority first
    PriorityAsc,

    /// Highest priority first
    PriorityDesc,

    /// Newest first
    CreatedAtDesc,
}

impl TaskSort {
    /// Parses a sort key as it appears in list requests, e.g. `"dueDate-asc"`.
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "dueDate-asc" => Some(TaskSort::DueDateAsc),
            "dueDate-desc" => Some(TaskSort::DueDateDesc),
            "priority-asc" => Some(TaskSort::PriorityAsc),
            "priority-desc" => Some(TaskSort::PriorityDesc),
            "createdAt-desc" => Some(TaskSort::CreatedAtDesc),
            _ => None,
        }
    }

    /// Sorts a slice of tasks in place according to this order.
    ///
    /// Used by the in-memory store; the Postgres store maps the variant to
    /// an ORDER BY clause instead.
    pub fn apply(&self, tasks: &mut [Task]) {
        match self {
            TaskSort::DueDateAsc => tasks.sort_by_key(|t| t.due_date),
            TaskSort::DueDateDesc => tasks.sort_by_key(|t| std::cmp::Reverse(t.due_date)),
            TaskSort::PriorityAsc => tasks.sort_by_key(|t| t.priority),
            TaskSort::PriorityDesc => tasks.sort_by_key(|t| std::cmp::Reverse(t.priority)),
            TaskSort::CreatedAtDesc => tasks.sort_by_key(|t| std::cmp::Reverse(t.created_at)),
        }
    }
}

/// Structured filter for a task listing request.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// View scope; determines the base visibility clause
    pub view: ViewScope,

    /// Case-insensitive substring match against title or description
    pub search: Option<String>,

    /// Exact status match
    pub status: Option<TaskStatus>,

    /// Exact priority match
    pub priority: Option<TaskPriority>,

    /// Filter by assignee (honored only in the `all` view)
    pub assigned_to: Option<Uuid>,

    /// Filter by creator (honored only in the `all` view)
    pub created_by: Option<Uuid>,

    /// Restrict to overdue tasks (due date passed, not completed)
    pub overdue: bool,

    /// Sort order
    pub sort: TaskSort,
}

impl TaskFilter {
    /// Compiles the filter into a predicate and sort order.
    ///
    /// `current_user` anchors the view scope; `now` anchors the overdue
    /// clause so that one listing reflects a single point in time.
    pub fn compile(&self, current_user: Uuid, now: DateTime<Utc>) -> (TaskPredicate, TaskSort) {
        let mut predicate = TaskPredicate::default();

        match self.view {
            ViewScope::My => {
                // The view wins: supplied assigned_to/created_by are dropped.
                predicate.visible_to = Some(current_user);
            }
            ViewScope::Assigned => {
                predicate.assignee = Some(current_user);
                predicate.creator = self.created_by;
            }
            ViewScope::All => {
                predicate.assignee = self.assigned_to;
                predicate.creator = self.created_by;
            }
        }

        predicate.search = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        predicate.status = self.status;
        predicate.priority = self.priority;

        if self.overdue {
            predicate.due_before = Some(now);
            predicate.status_not = Some(TaskStatus::Completed);
        }

        (predicate, self.sort)
    }
}

/// Conjunctive predicate over tasks.
///
/// Every `Some` field is a clause that must hold; `None` fields do not
/// constrain. The aggregation engine reuses this type for its counters.
#[derive(Debug, Clone, Default)]
pub struct TaskPredicate {
    /// Creator == user OR assignee == user (the "my tasks" clause)
    pub visible_to: Option<Uuid>,

    /// Assignee == user (unassigned tasks never match)
    pub assignee: Option<Uuid>,

    /// Creator == user
    pub creator: Option<Uuid>,

    /// Status equals
    pub status: Option<TaskStatus>,

    /// Status differs (used for "not completed" clauses)
    pub status_not: Option<TaskStatus>,

    /// Priority equals
    pub priority: Option<TaskPriority>,

    /// Lowercased substring matched against title or description
    pub search: Option<String>,

    /// Due date strictly before this instant
    pub due_before: Option<DateTime<Utc>>,

    /// Due date within `[start, end)`
    pub due_within: Option<(DateTime<Utc>, DateTime<Utc>)>,

    /// Created at or after this instant
    pub created_after: Option<DateTime<Utc>>,

    /// Updated at or after this instant
    pub updated_after: Option<DateTime<Utc>>,
}

impl TaskPredicate {
    /// Evaluates the predicate against a task.
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(user) = self.visible_to {
            if task.creator_id != user && task.assigned_to_id != Some(user) {
                return false;
            }
        }
        if let Some(user) = self.assignee {
            if task.assigned_to_id != Some(user) {
                return false;
            }
        }
        if let Some(user) = self.creator {
            if task.creator_id != user {
                return false;
            }
        }
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        if let Some(status) = self.status_not {
            if task.status == status {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if task.priority != priority {
                return false;
            }
        }
        if let Some(needle) = &self.search {
            let in_title = task.title.to_lowercase().contains(needle);
            let in_description = task
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(needle))
                .unwrap_or(false);
            if !in_title && !in_description {
                return false;
            }
        }
        if let Some(limit) = self.due_before {
            if task.due_date >= limit {
                return false;
            }
        }
        if let Some((start, end)) = self.due_within {
            if task.due_date < start || task.due_date >= end {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if task.created_at < after {
                return false;
            }
        }
        if let Some(after) = self.updated_after {
            if task.updated_at < after {
                return false;
            }
        }
        true
    }
}
