//! In-memory store implementations.
//!
//! Backed by `RwLock`'d maps; safe for concurrent use from many request
//! handlers. Predicate evaluation delegates to [`TaskPredicate::matches`],
//! making this the executable reference for the query semantics the
//! Postgres store compiles to SQL.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::task::{NewTask, Task, TaskChanges};
use crate::models::user::{NewUser, User};
use crate::query::{TaskPredicate, TaskSort};
use crate::store::{StoreError, TaskStore, UserDirectory};

/// In-memory [`TaskStore`].
#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create(&self, data: NewTask) -> Result<Task, StoreError> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            due_date: data.due_date,
            priority: data.priority,
            status: data.status,
            creator_id: data.creator_id,
            assigned_to_id: data.assigned_to_id,
            created_at: now,
            updated_at: now,
        };

        let mut tasks = self.tasks.write().await;
        tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.get(&id).cloned())
    }

    async fn update(&self, id: Uuid, changes: TaskChanges) -> Result<Option<Task>, StoreError> {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            task.title = title;
        }
        if let Some(description) = changes.description {
            task.description = description;
        }
        if let Some(due_date) = changes.due_date {
            task.due_date = due_date;
        }
        if let Some(priority) = changes.priority {
            task.priority = priority;
        }
        if let Some(status) = changes.status {
            task.status = status;
        }
        if let Some(assigned_to_id) = changes.assigned_to_id {
            task.assigned_to_id = assigned_to_id;
        }
        task.updated_at = Utc::now();

        Ok(Some(task.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tasks = self.tasks.write().await;
        Ok(tasks.remove(&id).is_some())
    }

    async fn query(
        &self,
        predicate: &TaskPredicate,
        sort: TaskSort,
    ) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.read().await;
        let mut matched: Vec<Task> = tasks
            .values()
            .filter(|t| predicate.matches(t))
            .cloned()
            .collect();
        drop(tasks);

        sort.apply(&mut matched);
        Ok(matched)
    }

    async fn count(&self, predicate: &TaskPredicate) -> Result<i64, StoreError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.values().filter(|t| predicate.matches(t)).count() as i64)
    }
}

/// In-memory [`UserDirectory`].
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn create(&self, data: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == data.email) {
            return Err(StoreError::Conflict(format!(
                "email already registered: {}",
                data.email
            )));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            name: data.name,
            role: data.role,
            password_hash: data.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{TaskPriority, TaskStatus};
    use crate::models::user::UserRole;
    use chrono::Duration;

    fn new_task(creator: Uuid) -> NewTask {
        NewTask {
            title: "Write onboarding doc".to_string(),
            description: None,
            due_date: Utc::now() + Duration::days(2),
            priority: TaskPriority::Medium,
            status: TaskStatus::Todo,
            creator_id: creator,
            assigned_to_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemoryTaskStore::new();
        let creator = Uuid::new_v4();

        let created = store.create(new_task(creator)).await.unwrap();
        let found = store.find_by_id(created.id).await.unwrap().unwrap();

        assert_eq!(found.id, created.id);
        assert_eq!(found.title, "Write onboarding doc");
        assert_eq!(found.creator_id, creator);
        assert_eq!(found.status, TaskStatus::Todo);
    }

    #[tokio::test]
    async fn test_update_is_partial() {
        let store = MemoryTaskStore::new();
        let created = store.create(new_task(Uuid::new_v4())).await.unwrap();

        let updated = store
            .update(
                created.id,
                TaskChanges {
                    priority: Some(TaskPriority::Urgent),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        // Only priority changed; the rest is untouched.
        assert_eq!(updated.priority, TaskPriority::Urgent);
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.status, created.status);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_can_clear_assignee() {
        let store = MemoryTaskStore::new();
        let mut data = new_task(Uuid::new_v4());
        data.assigned_to_id = Some(Uuid::new_v4());
        let created = store.create(data).await.unwrap();

        let updated = store
            .update(
                created.id,
                TaskChanges {
                    assigned_to_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.assigned_to_id, None);
    }

    #[tokio::test]
    async fn test_update_missing_returns_none() {
        let store = MemoryTaskStore::new();
        let result = store
            .update(Uuid::new_v4(), TaskChanges::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryTaskStore::new();
        let created = store.create(new_task(Uuid::new_v4())).await.unwrap();

        assert!(store.delete(created.id).await.unwrap());
        assert!(store.find_by_id(created.id).await.unwrap().is_none());
        assert!(!store.delete(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_query_filters_and_sorts() {
        let store = MemoryTaskStore::new();
        let creator = Uuid::new_v4();

        let mut early = new_task(creator);
        early.due_date = Utc::now() + Duration::days(1);
        let mut late = new_task(creator);
        late.due_date = Utc::now() + Duration::days(5);
        let other = new_task(Uuid::new_v4());

        let late = store.create(late).await.unwrap();
        let early = store.create(early).await.unwrap();
        store.create(other).await.unwrap();

        let predicate = TaskPredicate {
            creator: Some(creator),
            ..Default::default()
        };
        let results = store.query(&predicate, TaskSort::DueDateAsc).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, early.id);
        assert_eq!(results[1].id, late.id);
    }

    #[tokio::test]
    async fn test_count() {
        let store = MemoryTaskStore::new();
        let creator = Uuid::new_v4();
        store.create(new_task(creator)).await.unwrap();
        store.create(new_task(creator)).await.unwrap();

        let predicate = TaskPredicate {
            creator: Some(creator),
            ..Default::default()
        };
        assert_eq!(store.count(&predicate).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_user_directory_rejects_duplicate_email() {
        let directory = MemoryUserDirectory::new();
        let data = NewUser {
            email: "user@example.com".to_string(),
            name: None,
            role: UserRole::Member,
            password_hash: "hash".to_string(),
        };

        directory.create(data.clone()).await.unwrap();
        let result = directory.create(data).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_user_directory_lookup() {
        let directory = MemoryUserDirectory::new();
        let created = directory
            .create(NewUser {
                email: "user@example.com".to_string(),
                name: Some("User".to_string()),
                role: UserRole::Member,
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(
            directory.find_by_id(created.id).await.unwrap().unwrap().id,
            created.id
        );
        assert_eq!(
            directory
                .find_by_email("user@example.com")
                .await
                .unwrap()
                .unwrap()
                .id,
            created.id
        );
        assert!(directory
            .find_by_email("nobody@example.com")
            .await
            .unwrap()
            .is_none());
    }
}
