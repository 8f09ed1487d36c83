/// Postgres store implementations
///
/// sqlx-backed [`TaskStore`] and [`UserDirectory`]. Structured predicates
/// are compiled to a WHERE clause; partial updates build their SET list
/// dynamically so unset fields are never written.
///
/// # Example
///
/// ```no_run
/// use syncboard_shared::store::postgres::PgTaskStore;
/// use syncboard_shared::store::TaskStore;
/// use syncboard_shared::query::{TaskPredicate, TaskSort};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let store = PgTaskStore::new(pool);
/// let tasks = store.query(&TaskPredicate::default(), TaskSort::DueDateAsc).await?;
/// println!("{} tasks", tasks.len());
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::query::QueryAs;
use sqlx::Postgres;
use uuid::Uuid;

use crate::models::task::{NewTask, Task, TaskChanges};
use crate::models::user::{NewUser, User};
use crate::query::{TaskPredicate, TaskSort};
use crate::store::{StoreError, TaskStore, UserDirectory};

const TASK_COLUMNS: &str = "id, title, description, due_date, priority, status, \
                            creator_id, assigned_to_id, created_at, updated_at";

const USER_COLUMNS: &str = "id, email, name, role, password_hash, created_at, updated_at";

/// Postgres-backed [`TaskStore`].
#[derive(Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Appends the predicate's clauses to `sql` as `AND ...` fragments.
///
/// Placeholder numbering starts at `first_param`. Must stay in lockstep with
/// [`bind_predicate`]: both walk the predicate fields in the same order.
fn push_predicate_sql(predicate: &TaskPredicate, sql: &mut String, first_param: usize) -> usize {
    let mut n = first_param;
    let mut next = || {
        let current = n;
        n += 1;
        current
    };

    if predicate.visible_to.is_some() {
        let param = next();
        sql.push_str(&format!(
            " AND (creator_id = ${param} OR assigned_to_id = ${param})"
        ));
    }
    if predicate.assignee.is_some() {
        sql.push_str(&format!(" AND assigned_to_id = ${}", next()));
    }
    if predicate.creator.is_some() {
        sql.push_str(&format!(" AND creator_id = ${}", next()));
    }
    if predicate.status.is_some() {
        sql.push_str(&format!(" AND status = ${}", next()));
    }
    if predicate.status_not.is_some() {
        sql.push_str(&format!(" AND status <> ${}", next()));
    }
    if predicate.priority.is_some() {
        sql.push_str(&format!(" AND priority = ${}", next()));
    }
    if predicate.search.is_some() {
        let param = next();
        sql.push_str(&format!(
            " AND (title ILIKE ${param} OR description ILIKE ${param})"
        ));
    }
    if predicate.due_before.is_some() {
        sql.push_str(&format!(" AND due_date < ${}", next()));
    }
    if predicate.due_within.is_some() {
        sql.push_str(&format!(
            " AND due_date >= ${} AND due_date < ${}",
            next(),
            next()
        ));
    }
    if predicate.created_after.is_some() {
        sql.push_str(&format!(" AND created_at >= ${}", next()));
    }
    if predicate.updated_after.is_some() {
        sql.push_str(&format!(" AND updated_at >= ${}", next()));
    }

    n
}

/// Binds the predicate's values in the order [`push_predicate_sql`] emitted
/// their placeholders.
fn bind_predicate<'q, O>(
    predicate: &'q TaskPredicate,
    mut query: QueryAs<'q, Postgres, O, sqlx::postgres::PgArguments>,
) -> QueryAs<'q, Postgres, O, sqlx::postgres::PgArguments> {
    if let Some(user) = predicate.visible_to {
        query = query.bind(user);
    }
    if let Some(user) = predicate.assignee {
        query = query.bind(user);
    }
    if let Some(user) = predicate.creator {
        query = query.bind(user);
    }
    if let Some(status) = predicate.status {
        query = query.bind(status);
    }
    if let Some(status) = predicate.status_not {
        query = query.bind(status);
    }
    if let Some(priority) = predicate.priority {
        query = query.bind(priority);
    }
    if let Some(search) = &predicate.search {
        query = query.bind(format!("%{search}%"));
    }
    if let Some(limit) = predicate.due_before {
        query = query.bind(limit);
    }
    if let Some((start, end)) = predicate.due_within {
        query = query.bind(start).bind(end);
    }
    if let Some(after) = predicate.created_after {
        query = query.bind(after);
    }
    if let Some(after) = predicate.updated_after {
        query = query.bind(after);
    }
    query
}

fn order_by(sort: TaskSort) -> &'static str {
    // task_priority is a Postgres enum; ORDER BY follows declaration order.
    match sort {
        TaskSort::DueDateAsc => "due_date ASC",
        TaskSort::DueDateDesc => "due_date DESC",
        TaskSort::PriorityAsc => "priority ASC",
        TaskSort::PriorityDesc => "priority DESC",
        TaskSort::CreatedAtDesc => "created_at DESC",
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn create(&self, data: NewTask) -> Result<Task, StoreError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (title, description, due_date, priority, status, creator_id, assigned_to_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(data.title)
        .bind(data.description)
        .bind(data.due_date)
        .bind(data.priority)
        .bind(data.status)
        .bind(data.creator_id)
        .bind(data.assigned_to_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(task)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn update(&self, id: Uuid, changes: TaskChanges) -> Result<Option<Task>, StoreError> {
        if changes.is_empty() {
            // Nothing to write; still bump updated_at to keep the
            // "every mutation touches updated_at" invariant.
            let task = sqlx::query_as::<_, Task>(&format!(
                "UPDATE tasks SET updated_at = NOW() WHERE id = $1 RETURNING {TASK_COLUMNS}"
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
            return Ok(task);
        }

        // Build the SET list dynamically so unset fields stay untouched.
        let mut sql = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut n = 1;

        if changes.title.is_some() {
            n += 1;
            sql.push_str(&format!(", title = ${n}"));
        }
        if changes.description.is_some() {
            n += 1;
            sql.push_str(&format!(", description = ${n}"));
        }
        if changes.due_date.is_some() {
            n += 1;
            sql.push_str(&format!(", due_date = ${n}"));
        }
        if changes.priority.is_some() {
            n += 1;
            sql.push_str(&format!(", priority = ${n}"));
        }
        if changes.status.is_some() {
            n += 1;
            sql.push_str(&format!(", status = ${n}"));
        }
        if changes.assigned_to_id.is_some() {
            n += 1;
            sql.push_str(&format!(", assigned_to_id = ${n}"));
        }

        sql.push_str(&format!(" WHERE id = $1 RETURNING {TASK_COLUMNS}"));

        let mut query = sqlx::query_as::<_, Task>(&sql).bind(id);

        if let Some(title) = changes.title {
            query = query.bind(title);
        }
        if let Some(description) = changes.description {
            query = query.bind(description);
        }
        if let Some(due_date) = changes.due_date {
            query = query.bind(due_date);
        }
        if let Some(priority) = changes.priority {
            query = query.bind(priority);
        }
        if let Some(status) = changes.status {
            query = query.bind(status);
        }
        if let Some(assigned_to_id) = changes.assigned_to_id {
            query = query.bind(assigned_to_id);
        }

        let task = query.fetch_optional(&self.pool).await?;
        Ok(task)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn query(
        &self,
        predicate: &TaskPredicate,
        sort: TaskSort,
    ) -> Result<Vec<Task>, StoreError> {
        let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE TRUE");
        push_predicate_sql(predicate, &mut sql, 1);
        sql.push_str(&format!(" ORDER BY {}", order_by(sort)));

        let query = sqlx::query_as::<_, Task>(&sql);
        let tasks = bind_predicate(predicate, query).fetch_all(&self.pool).await?;

        Ok(tasks)
    }

    async fn count(&self, predicate: &TaskPredicate) -> Result<i64, StoreError> {
        let mut sql = String::from("SELECT COUNT(*) FROM tasks WHERE TRUE");
        push_predicate_sql(predicate, &mut sql, 1);

        let query = sqlx::query_as::<_, (i64,)>(&sql);
        let (count,) = bind_predicate(predicate, query).fetch_one(&self.pool).await?;

        Ok(count)
    }
}

/// Postgres-backed [`UserDirectory`].
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn create(&self, data: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, name, role, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(data.email)
        .bind(data.name)
        .bind(data.role)
        .bind(data.password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{TaskPriority, TaskStatus};
    use chrono::Utc;

    #[test]
    fn test_predicate_sql_empty() {
        let mut sql = String::from("SELECT 1 FROM tasks WHERE TRUE");
        let next = push_predicate_sql(&TaskPredicate::default(), &mut sql, 1);
        assert_eq!(sql, "SELECT 1 FROM tasks WHERE TRUE");
        assert_eq!(next, 1);
    }

    #[test]
    fn test_predicate_sql_visibility_reuses_placeholder() {
        let predicate = TaskPredicate {
            visible_to: Some(Uuid::new_v4()),
            ..Default::default()
        };
        let mut sql = String::new();
        let next = push_predicate_sql(&predicate, &mut sql, 1);

        assert_eq!(sql, " AND (creator_id = $1 OR assigned_to_id = $1)");
        // One placeholder, one bind.
        assert_eq!(next, 2);
    }

    #[test]
    fn test_predicate_sql_numbering() {
        let now = Utc::now();
        let predicate = TaskPredicate {
            assignee: Some(Uuid::new_v4()),
            status_not: Some(TaskStatus::Completed),
            due_before: Some(now),
            ..Default::default()
        };
        let mut sql = String::new();
        let next = push_predicate_sql(&predicate, &mut sql, 2);

        assert_eq!(
            sql,
            " AND assigned_to_id = $2 AND status <> $3 AND due_date < $4"
        );
        assert_eq!(next, 5);
    }

    #[test]
    fn test_predicate_sql_due_window_uses_two_placeholders() {
        let now = Utc::now();
        let predicate = TaskPredicate {
            due_within: Some((now, now)),
            priority: Some(TaskPriority::High),
            ..Default::default()
        };
        let mut sql = String::new();
        push_predicate_sql(&predicate, &mut sql, 1);

        assert_eq!(
            sql,
            " AND priority = $1 AND due_date >= $2 AND due_date < $3"
        );
    }

    #[test]
    fn test_order_by_mapping() {
        assert_eq!(order_by(TaskSort::DueDateAsc), "due_date ASC");
        assert_eq!(order_by(TaskSort::PriorityDesc), "priority DESC");
        assert_eq!(order_by(TaskSort::CreatedAtDesc), "created_at DESC");
    }
}
