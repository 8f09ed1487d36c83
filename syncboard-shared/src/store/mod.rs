/// Storage abstraction
///
/// The task engine talks to persistence through the [`TaskStore`] and
/// [`UserDirectory`] traits. Not-found is always a distinct outcome
/// (`Option`/`bool`), never folded into [`StoreError`], so callers can map
/// it to the right client-facing failure.
///
/// Two implementations ship:
///
/// - [`memory`]: concurrency-safe in-memory maps; the reference
///   implementation of predicate evaluation, used heavily by tests
/// - [`postgres`]: sqlx-backed store compiling predicates to SQL

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::task::{NewTask, Task, TaskChanges};
use crate::models::user::{NewUser, User};
use crate::query::{TaskPredicate, TaskSort};

/// Error type for store operations.
///
/// Backend failures are opaque to the task engine; it does not reinterpret
/// them beyond passing them upward as non-retryable internal failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated (e.g. duplicate email)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other backend failure
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.constraint().is_some() => {
                StoreError::Conflict(format!(
                    "constraint violation: {}",
                    db_err.constraint().unwrap_or_default()
                ))
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// Persistence boundary for tasks.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persists a new task, stamping id and timestamps.
    async fn create(&self, data: NewTask) -> Result<Task, StoreError>;

    /// Fetches a task by id; `None` if it does not exist.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    /// Applies a partial update, bumping `updated_at`.
    ///
    /// Returns `None` if the task does not exist (e.g. deleted by a
    /// concurrent caller between read and write).
    async fn update(&self, id: Uuid, changes: TaskChanges) -> Result<Option<Task>, StoreError>;

    /// Removes a task. Returns `false` if it did not exist.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Returns all tasks matching the predicate, in the given order.
    async fn query(
        &self,
        predicate: &TaskPredicate,
        sort: TaskSort,
    ) -> Result<Vec<Task>, StoreError>;

    /// Counts tasks matching the predicate.
    async fn count(&self, predicate: &TaskPredicate) -> Result<i64, StoreError>;
}

/// Lookup boundary for user identities.
///
/// Used for assignment target validation, socket identity resolution, and
/// the auth endpoints.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Persists a new user. Fails with [`StoreError::Conflict`] on a
    /// duplicate email.
    async fn create(&self, data: NewUser) -> Result<User, StoreError>;

    /// Fetches a user by id; `None` if unknown.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Fetches a user by email; `None` if unknown.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}
