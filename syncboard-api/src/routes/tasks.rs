/// Task endpoints
///
/// CRUD plus the two dedicated mutations (assign, status change) and the
/// filtered listing. Dates and enum values arrive as wire strings and are
/// parsed here so malformed input surfaces as a 422 `validation_failed`
/// rather than a generic deserialization error; the status string for the
/// status-change endpoint is passed through to the service untouched, which
/// owns the known-value check.
///
/// Every handler threads the authenticated user from the request's
/// [`AuthContext`] into the service as an explicit argument.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;
use validator::Validate;

use syncboard_shared::auth::AuthContext;
use syncboard_shared::models::task::{Task, TaskPriority, TaskStatus};
use syncboard_shared::query::{TaskFilter, TaskSort, ViewScope};
use syncboard_shared::service::{CreateTaskInput, UpdateTaskInput};

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};

/// Deserializes a field that distinguishes "absent" from "explicitly null".
///
/// With `#[serde(default)]`, an absent field stays `None` while a present
/// field (null included) becomes `Some(...)` - the partial-update contract.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

fn parse_due_date(value: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ApiError::validation("dueDate", format!("unparseable date: {value}")))
}

fn parse_priority(value: &str) -> Result<TaskPriority, ApiError> {
    value
        .parse()
        .map_err(|_| ApiError::validation("priority", format!("unknown priority: {value}")))
}

fn parse_status(value: &str) -> Result<TaskStatus, ApiError> {
    value
        .parse()
        .map_err(|_| ApiError::validation("status", format!("unknown status: {value}")))
}

/// Create task request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// Title (1-200 characters)
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Due date as an RFC 3339 timestamp
    pub due_date: String,

    /// Priority (`LOW`/`MEDIUM`/`HIGH`/`URGENT`); defaults to MEDIUM
    pub priority: Option<String>,

    /// Initial status; defaults to TODO
    pub status: Option<String>,

    /// Optional initial assignee
    pub assigned_to_id: Option<Uuid>,
}

/// Update task request; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,

    /// `null` clears the description
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub due_date: Option<String>,

    pub priority: Option<String>,

    pub status: Option<String>,

    /// `null` unassigns the task
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to_id: Option<Option<Uuid>>,
}

/// Assign task request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTaskRequest {
    /// The new assignee
    pub assigned_to_id: Uuid,
}

/// Status change request
#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    /// Raw status value; the service validates it against the four known
    /// statuses
    pub status: String,
}

/// List query parameters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    /// View scope: `my` (default), `assigned`, `all`
    pub view: Option<String>,

    /// Substring search over title and description
    pub search: Option<String>,

    /// Status filter
    pub status: Option<String>,

    /// Priority filter
    pub priority: Option<String>,

    /// Assignee filter (only honored in the `all` view)
    pub assigned_to: Option<Uuid>,

    /// Creator filter (only honored in the `all` view)
    pub created_by: Option<Uuid>,

    /// `"true"` restricts to overdue tasks
    pub overdue: Option<String>,

    /// Sort key, e.g. `dueDate-asc` (default), `priority-desc`
    pub sort_by: Option<String>,
}

impl ListTasksQuery {
    fn into_filter(self) -> Result<TaskFilter, ApiError> {
        let view = match self.view.as_deref() {
            None => ViewScope::default(),
            Some(name) => ViewScope::parse(name)
                .ok_or_else(|| ApiError::validation("view", format!("unknown view: {name}")))?,
        };

        let status = self.status.as_deref().map(parse_status).transpose()?;
        let priority = self.priority.as_deref().map(parse_priority).transpose()?;

        let sort = match self.sort_by.as_deref() {
            None => TaskSort::default(),
            Some(key) => TaskSort::parse(key)
                .ok_or_else(|| ApiError::validation("sortBy", format!("unknown sort: {key}")))?,
        };

        Ok(TaskFilter {
            view,
            search: self.search,
            status,
            priority,
            assigned_to: self.assigned_to,
            created_by: self.created_by,
            overdue: self.overdue.as_deref() == Some("true"),
            sort,
        })
    }
}

/// `POST /v1/tasks` - create a task.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let input = CreateTaskInput {
        title: req.title,
        description: req.description,
        due_date: parse_due_date(&req.due_date)?,
        priority: req.priority.as_deref().map(parse_priority).transpose()?,
        status: req.status.as_deref().map(parse_status).transpose()?,
        assigned_to_id: req.assigned_to_id,
    };

    let task = state.service.create_task(auth.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// `GET /v1/tasks` - filtered listing.
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let filter = query.into_filter()?;
    let tasks = state.service.list_tasks(auth.user_id, &filter).await?;
    Ok(Json(tasks))
}

/// `GET /v1/tasks/:id` - fetch one task.
pub async fn get_task(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = state.service.find_task(task_id).await?;
    Ok(Json(task))
}

/// `PUT /v1/tasks/:id` - partial update.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let input = UpdateTaskInput {
        title: req.title,
        description: req.description,
        due_date: req.due_date.as_deref().map(parse_due_date).transpose()?,
        priority: req.priority.as_deref().map(parse_priority).transpose()?,
        status: req.status.as_deref().map(parse_status).transpose()?,
        assigned_to_id: req.assigned_to_id,
    };

    let task = state.service.update_task(auth.user_id, task_id, input).await?;
    Ok(Json(task))
}

/// `DELETE /v1/tasks/:id` - creator-only atomic removal.
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.service.delete_task(auth.user_id, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /v1/tasks/:id/assign` - creator-only assignment.
pub async fn assign_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<AssignTaskRequest>,
) -> ApiResult<Json<Task>> {
    let task = state
        .service
        .assign_task(auth.user_id, task_id, req.assigned_to_id)
        .await?;
    Ok(Json(task))
}

/// `POST /v1/tasks/:id/status` - status transition.
pub async fn change_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<ChangeStatusRequest>,
) -> ApiResult<Json<Task>> {
    let task = state
        .service
        .change_status(auth.user_id, task_id, &req.status)
        .await?;
    Ok(Json(task))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_distinguishes_absent_from_null() {
        let absent: UpdateTaskRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(absent.description, None);
        assert_eq!(absent.assigned_to_id, None);

        let cleared: UpdateTaskRequest =
            serde_json::from_str(r#"{"description": null, "assignedToId": null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));
        assert_eq!(cleared.assigned_to_id, Some(None));

        let set: UpdateTaskRequest =
            serde_json::from_str(r#"{"description": "text"}"#).unwrap();
        assert_eq!(set.description, Some(Some("text".to_string())));
    }

    #[test]
    fn test_create_request_validation() {
        let valid = CreateTaskRequest {
            title: "Task".to_string(),
            description: None,
            due_date: "2026-08-10T12:00:00Z".to_string(),
            priority: None,
            status: None,
            assigned_to_id: None,
        };
        assert!(valid.validate().is_ok());

        let empty_title = CreateTaskRequest {
            title: String::new(),
            description: None,
            due_date: "2026-08-10T12:00:00Z".to_string(),
            priority: None,
            status: None,
            assigned_to_id: None,
        };
        assert!(empty_title.validate().is_err());

        let long_title = CreateTaskRequest {
            title: "x".repeat(201),
            description: None,
            due_date: "2026-08-10T12:00:00Z".to_string(),
            priority: None,
            status: None,
            assigned_to_id: None,
        };
        assert!(long_title.validate().is_err());
    }

    #[test]
    fn test_parse_due_date() {
        assert!(parse_due_date("2026-08-10T12:00:00Z").is_ok());
        assert!(parse_due_date("2026-08-10T12:00:00+02:00").is_ok());
        assert!(parse_due_date("next tuesday").is_err());
    }

    #[test]
    fn test_list_query_into_filter() {
        let query = ListTasksQuery {
            view: Some("all".to_string()),
            status: Some("IN_PROGRESS".to_string()),
            overdue: Some("true".to_string()),
            sort_by: Some("priority-desc".to_string()),
            ..Default::default()
        };

        let filter = query.into_filter().unwrap();
        assert_eq!(filter.view, ViewScope::All);
        assert_eq!(filter.status, Some(TaskStatus::InProgress));
        assert!(filter.overdue);
        assert_eq!(filter.sort, TaskSort::PriorityDesc);
    }

    #[test]
    fn test_list_query_defaults() {
        let filter = ListTasksQuery::default().into_filter().unwrap();
        assert_eq!(filter.view, ViewScope::My);
        assert_eq!(filter.sort, TaskSort::DueDateAsc);
        assert!(!filter.overdue);
    }

    #[test]
    fn test_list_query_rejects_unknown_values() {
        let bad_view = ListTasksQuery {
            view: Some("everything".to_string()),
            ..Default::default()
        };
        assert!(bad_view.into_filter().is_err());

        let bad_status = ListTasksQuery {
            status: Some("Completed".to_string()),
            ..Default::default()
        };
        assert!(bad_status.into_filter().is_err());

        let bad_sort = ListTasksQuery {
            sort_by: Some("title-asc".to_string()),
            ..Default::default()
        };
        assert!(bad_sort.into_filter().is_err());
    }

    #[test]
    fn test_overdue_flag_only_accepts_true() {
        let falsy = ListTasksQuery {
            overdue: Some("false".to_string()),
            ..Default::default()
        };
        assert!(!falsy.into_filter().unwrap().overdue);

        let yes = ListTasksQuery {
            overdue: Some("true".to_string()),
            ..Default::default()
        };
        assert!(yes.into_filter().unwrap().overdue);
    }
}
