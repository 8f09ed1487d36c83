/// Task lifecycle service
///
/// Orchestrates every task mutation: authorization via [`crate::policy`],
/// persistence via the injected [`TaskStore`], and a domain event per
/// successful mutation via the injected [`EventFanout`]. The acting user is
/// always an explicit argument - there is no ambient request context.
///
/// # Concurrency
///
/// Mutations follow a read-then-decide-then-write sequence (read the task,
/// check policy, write). Two concurrent updates to the same task can
/// interleave so that the later write wins while the earlier caller's
/// authorization decision was made against now-stale data. This is a known,
/// accepted race: tasks are low-contention, human-edited objects, and the
/// store's single-record updates keep each individual write atomic. No
/// cross-request lock is taken, and none is held across a store await.
///
/// Events are emitted after the store write commits. If delivery fails the
/// committed mutation stands; two sequential mutations by the same caller
/// on the same task are handed to the fanout in apply order.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use syncboard_shared::events::NoopFanout;
/// use syncboard_shared::service::{CreateTaskInput, TaskService};
/// use syncboard_shared::store::memory::{MemoryTaskStore, MemoryUserDirectory};
/// use chrono::Utc;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = TaskService::new(
///     Arc::new(MemoryTaskStore::new()),
///     Arc::new(MemoryUserDirectory::new()),
///     Arc::new(NoopFanout),
/// );
///
/// let task = service
///     .create_task(
///         Uuid::new_v4(),
///         CreateTaskInput {
///             title: "Plan sprint review".to_string(),
///             due_date: Utc::now(),
///             ..Default::default()
///         },
///     )
///     .await?;
/// println!("created {}", task.id);
/// # Ok(())
/// # }
/// ```

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use uuid::Uuid;

use crate::events::{DomainEvent, EventFanout, EventPayload};
use crate::models::task::{
    NewTask, Task, TaskChanges, TaskPriority, TaskStatus, TITLE_MAX_LEN,
};
use crate::policy;
use crate::query::TaskFilter;
use crate::stats::{dashboard_stats, DashboardStats, StatWindows};
use crate::store::{StoreError, TaskStore, UserDirectory};

/// Error type for task operations.
///
/// The first four variants are client-caused and map to distinct HTTP
/// statuses; [`TaskError::Store`] is opaque and non-retryable.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The referenced task or user does not exist
    #[error("not found")]
    NotFound,

    /// Authenticated but not authorized for this operation on this task
    #[error("not authorized to perform this operation")]
    Forbidden,

    /// Malformed input (bad title length, unparseable date, unknown enum)
    #[error("validation failed on {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// The supplied status is not one of the four known values
    #[error("invalid status: {0}")]
    InvalidStatus(String),

    /// Opaque backend failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Input for creating a task.
#[derive(Debug, Clone)]
pub struct CreateTaskInput {
    /// Title, 1..=200 characters after trimming
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Due date
    pub due_date: DateTime<Utc>,

    /// Priority; defaults to MEDIUM
    pub priority: Option<TaskPriority>,

    /// Initial status; defaults to TODO
    pub status: Option<TaskStatus>,

    /// Optional initial assignee (must exist)
    pub assigned_to_id: Option<Uuid>,
}

impl Default for CreateTaskInput {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: None,
            due_date: Utc::now(),
            priority: None,
            status: None,
            assigned_to_id: None,
        }
    }
}

/// Partial update input; unset fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateTaskInput {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub assigned_to_id: Option<Option<Uuid>>,
}

/// The task lifecycle service.
///
/// Cheap to clone; all dependencies are behind `Arc`.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    users: Arc<dyn UserDirectory>,
    fanout: Arc<dyn EventFanout>,
}

impl TaskService {
    /// Creates the service with its three injected collaborators.
    pub fn new(
        store: Arc<dyn TaskStore>,
        users: Arc<dyn UserDirectory>,
        fanout: Arc<dyn EventFanout>,
    ) -> Self {
        Self {
            store,
            users,
            fanout,
        }
    }

    /// Creates a task on behalf of `creator_id`.
    ///
    /// Status defaults to TODO and priority to MEDIUM unless provided.
    /// Emits `task:created` as a broadcast.
    ///
    /// # Errors
    ///
    /// - [`TaskError::Validation`] for an empty or overlong title
    /// - [`TaskError::NotFound`] if an initial assignee is given but unknown
    pub async fn create_task(
        &self,
        creator_id: Uuid,
        input: CreateTaskInput,
    ) -> Result<Task, TaskError> {
        let title = validate_title(&input.title)?;

        if let Some(assignee) = input.assigned_to_id {
            self.require_user(assignee).await?;
        }

        let task = self
            .store
            .create(NewTask {
                title,
                description: input.description,
                due_date: input.due_date,
                priority: input.priority.unwrap_or(TaskPriority::Medium),
                status: input.status.unwrap_or(TaskStatus::Todo),
                creator_id,
                assigned_to_id: input.assigned_to_id,
            })
            .await?;

        tracing::info!(task_id = %task.id, creator_id = %creator_id, "task created");

        self.fanout
            .deliver(DomainEvent::broadcast(EventPayload::TaskCreated(
                task.clone(),
            )))
            .await;

        Ok(task)
    }

    /// Applies a partial update on behalf of `acting_user`.
    ///
    /// Only the creator or the current assignee may update. If the assignee
    /// changes to a new user, a targeted `task:assigned` is emitted to that
    /// user in addition to the broadcast `task:updated`.
    pub async fn update_task(
        &self,
        acting_user: Uuid,
        task_id: Uuid,
        input: UpdateTaskInput,
    ) -> Result<Task, TaskError> {
        let task = self.require_task(task_id).await?;

        if !policy::can_edit(&task, acting_user) {
            return Err(TaskError::Forbidden);
        }

        let title = match input.title {
            Some(title) => Some(validate_title(&title)?),
            None => None,
        };

        if let Some(Some(new_assignee)) = input.assigned_to_id {
            self.require_user(new_assignee).await?;
        }

        let previous_assignee = task.assigned_to_id;
        let updated = self
            .store
            .update(
                task_id,
                TaskChanges {
                    title,
                    description: input.description,
                    due_date: input.due_date,
                    priority: input.priority,
                    status: input.status,
                    assigned_to_id: input.assigned_to_id,
                },
            )
            .await?
            .ok_or(TaskError::NotFound)?;

        tracing::debug!(task_id = %task_id, acting_user = %acting_user, "task updated");

        self.fanout
            .deliver(DomainEvent::broadcast(EventPayload::TaskUpdated(
                updated.clone(),
            )))
            .await;

        if let Some(new_assignee) = updated.assigned_to_id {
            if previous_assignee != Some(new_assignee) {
                self.fanout
                    .deliver(DomainEvent::to_user(
                        new_assignee,
                        EventPayload::TaskAssigned {
                            task: updated.clone(),
                            assigned_by: acting_user,
                        },
                    ))
                    .await;
            }
        }

        Ok(updated)
    }

    /// Deletes a task on behalf of `acting_user`.
    ///
    /// Deletion is creator-only and atomic. Emits `task:deleted` carrying
    /// only the task id.
    pub async fn delete_task(&self, acting_user: Uuid, task_id: Uuid) -> Result<(), TaskError> {
        let task = self.require_task(task_id).await?;

        if !policy::can_delete(&task, acting_user) {
            return Err(TaskError::Forbidden);
        }

        if !self.store.delete(task_id).await? {
            // Removed by a concurrent caller between read and write.
            return Err(TaskError::NotFound);
        }

        tracing::info!(task_id = %task_id, acting_user = %acting_user, "task deleted");

        self.fanout
            .deliver(DomainEvent::broadcast(EventPayload::TaskDeleted(task_id)))
            .await;

        Ok(())
    }

    /// Assigns the task to `new_assignee` on behalf of `acting_user`.
    ///
    /// Creator-only, stricter than a generic update. Emits a broadcast
    /// `task:updated` plus a targeted `task:assigned` to the new assignee.
    pub async fn assign_task(
        &self,
        acting_user: Uuid,
        task_id: Uuid,
        new_assignee: Uuid,
    ) -> Result<Task, TaskError> {
        let task = self.require_task(task_id).await?;

        if !policy::can_assign(&task, acting_user) {
            return Err(TaskError::Forbidden);
        }

        self.require_user(new_assignee).await?;

        let updated = self
            .store
            .update(
                task_id,
                TaskChanges {
                    assigned_to_id: Some(Some(new_assignee)),
                    ..Default::default()
                },
            )
            .await?
            .ok_or(TaskError::NotFound)?;

        tracing::info!(
            task_id = %task_id,
            acting_user = %acting_user,
            assignee = %new_assignee,
            "task assigned"
        );

        self.fanout
            .deliver(DomainEvent::broadcast(EventPayload::TaskUpdated(
                updated.clone(),
            )))
            .await;
        self.fanout
            .deliver(DomainEvent::to_user(
                new_assignee,
                EventPayload::TaskAssigned {
                    task: updated.clone(),
                    assigned_by: acting_user,
                },
            ))
            .await;

        Ok(updated)
    }

    /// Changes the task status on behalf of `acting_user`.
    ///
    /// `new_status` arrives as the raw wire string; anything other than the
    /// four known values fails with [`TaskError::InvalidStatus`]. The
    /// lifecycle is permissive - any known status may follow any other, so
    /// re-running the same transition is a permitted no-op write.
    ///
    /// When the new status is COMPLETED, a targeted `task:statusChanged`
    /// notice is additionally sent to the creator's channel.
    pub async fn change_status(
        &self,
        acting_user: Uuid,
        task_id: Uuid,
        new_status: &str,
    ) -> Result<Task, TaskError> {
        let task = self.require_task(task_id).await?;

        if !policy::can_change_status(&task, acting_user) {
            return Err(TaskError::Forbidden);
        }

        let status = TaskStatus::from_str(new_status)
            .map_err(|_| TaskError::InvalidStatus(new_status.to_string()))?;

        let updated = self
            .store
            .update(
                task_id,
                TaskChanges {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .await?
            .ok_or(TaskError::NotFound)?;

        tracing::info!(
            task_id = %task_id,
            acting_user = %acting_user,
            status = %status,
            "task status changed"
        );

        self.fanout
            .deliver(DomainEvent::broadcast(EventPayload::TaskUpdated(
                updated.clone(),
            )))
            .await;

        if status == TaskStatus::Completed {
            self.fanout
                .deliver(DomainEvent::to_user(
                    updated.creator_id,
                    EventPayload::TaskStatusChanged {
                        task: updated.clone(),
                        changed_by: acting_user,
                    },
                ))
                .await;
        }

        Ok(updated)
    }

    /// Fetches a single task.
    ///
    /// Task records are tenant-wide readable by any authenticated user, so
    /// no per-user visibility check applies here.
    pub async fn find_task(&self, task_id: Uuid) -> Result<Task, TaskError> {
        self.require_task(task_id).await
    }

    /// Lists tasks matching `filter` as seen by `acting_user`.
    pub async fn list_tasks(
        &self,
        acting_user: Uuid,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, TaskError> {
        let (predicate, sort) = filter.compile(acting_user, Utc::now());
        Ok(self.store.query(&predicate, sort).await?)
    }

    /// Computes the dashboard counters for a user.
    pub async fn dashboard(&self, user_id: Uuid) -> Result<DashboardStats, TaskError> {
        let windows = StatWindows::at(Local::now());
        Ok(dashboard_stats(self.store.as_ref(), user_id, windows).await?)
    }

    async fn require_task(&self, task_id: Uuid) -> Result<Task, TaskError> {
        self.store
            .find_by_id(task_id)
            .await?
            .ok_or(TaskError::NotFound)
    }

    async fn require_user(&self, user_id: Uuid) -> Result<(), TaskError> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(|_| ())
            .ok_or(TaskError::NotFound)
    }
}

fn validate_title(title: &str) -> Result<String, TaskError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskError::Validation {
            field: "title",
            message: "title must not be empty".to_string(),
        });
    }
    if trimmed.chars().count() > TITLE_MAX_LEN {
        return Err(TaskError::Validation {
            field: "title",
            message: format!("title must be at most {TITLE_MAX_LEN} characters"),
        });
    }
    Ok(trimmed.to_string())
}
