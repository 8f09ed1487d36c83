/// Domain events and the fanout boundary
///
/// Every successful mutation in the lifecycle service produces one or more
/// [`DomainEvent`]s. Events are ephemeral: constructed after the store write
/// commits, handed to the injected [`EventFanout`], and discarded. They are
/// a side channel, not part of the transaction - a failed or dropped
/// delivery never affects the mutation's outcome.
///
/// The fanout is an explicit dependency injected into the service at
/// construction time so tests can substitute a recording implementation;
/// the service never reaches into ambient global state.

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::task::Task;

/// Delivery destination for a domain event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTarget {
    /// Every currently-authenticated connection
    Broadcast,

    /// Only the channel of one specific user
    User(Uuid),
}

/// Payload of a domain event, named after its wire event.
#[derive(Debug, Clone)]
pub enum EventPayload {
    /// `task:created` - a new task snapshot
    TaskCreated(Task),

    /// `task:updated` - the post-mutation task snapshot
    TaskUpdated(Task),

    /// `task:deleted` - the removed task's id only
    TaskDeleted(Uuid),

    /// `task:assigned` - the task plus who performed the assignment
    TaskAssigned { task: Task, assigned_by: Uuid },

    /// `task:statusChanged` - completion notice for the creator
    TaskStatusChanged { task: Task, changed_by: Uuid },
}

impl EventPayload {
    /// Wire event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            EventPayload::TaskCreated(_) => "task:created",
            EventPayload::TaskUpdated(_) => "task:updated",
            EventPayload::TaskDeleted(_) => "task:deleted",
            EventPayload::TaskAssigned { .. } => "task:assigned",
            EventPayload::TaskStatusChanged { .. } => "task:statusChanged",
        }
    }

    /// Builds the JSON frame delivered to sockets:
    /// `{"event": <name>, "data": <payload>}`.
    pub fn wire_frame(&self) -> Value {
        let data = match self {
            EventPayload::TaskCreated(task) | EventPayload::TaskUpdated(task) => json!(task),
            EventPayload::TaskDeleted(task_id) => json!(task_id.to_string()),
            EventPayload::TaskAssigned { task, assigned_by } => json!({
                "task": task,
                "assignedBy": assigned_by.to_string(),
            }),
            EventPayload::TaskStatusChanged { task, changed_by } => json!({
                "task": task,
                "changedBy": changed_by.to_string(),
            }),
        };
        json!({ "event": self.event_name(), "data": data })
    }
}

/// A routed domain event.
#[derive(Debug, Clone)]
pub struct DomainEvent {
    pub target: EventTarget,
    pub payload: EventPayload,
}

impl DomainEvent {
    /// Event addressed to every authenticated connection.
    pub fn broadcast(payload: EventPayload) -> Self {
        Self {
            target: EventTarget::Broadcast,
            payload,
        }
    }

    /// Event addressed to one user's channel.
    pub fn to_user(user_id: Uuid, payload: EventPayload) -> Self {
        Self {
            target: EventTarget::User(user_id),
            payload,
        }
    }
}

/// Boundary through which the lifecycle service emits events.
///
/// Implementations must be non-blocking from the caller's perspective: a
/// slow or disconnected subscriber never delays or fails a mutation. If the
/// target user has no live connection, the event is silently dropped
/// (at-most-once, best-effort).
#[async_trait]
pub trait EventFanout: Send + Sync {
    async fn deliver(&self, event: DomainEvent);
}

/// Fanout that discards every event.
///
/// Useful for contexts with no realtime layer (one-off scripts, some tests).
pub struct NoopFanout;

#[async_trait]
impl EventFanout for NoopFanout {
    async fn deliver(&self, _event: DomainEvent) {}
}

/// Fanout that records every event it receives, for assertions in tests.
pub struct RecordingFanout {
    events: std::sync::Mutex<Vec<DomainEvent>>,
}

impl RecordingFanout {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of everything delivered so far, in order.
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().expect("fanout mutex poisoned").clone()
    }
}

impl Default for RecordingFanout {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventFanout for RecordingFanout {
    async fn deliver(&self, event: DomainEvent) {
        self.events.lock().expect("fanout mutex poisoned").push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{TaskPriority, TaskStatus};
    use chrono::Utc;

    fn sample_task() -> Task {
        Task {
            id: Uuid::new_v4(),
            title: "Draft announcement".to_string(),
            description: None,
            due_date: Utc::now(),
            priority: TaskPriority::Low,
            status: TaskStatus::Todo,
            creator_id: Uuid::new_v4(),
            assigned_to_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_event_names() {
        let task = sample_task();
        assert_eq!(EventPayload::TaskCreated(task.clone()).event_name(), "task:created");
        assert_eq!(EventPayload::TaskUpdated(task.clone()).event_name(), "task:updated");
        assert_eq!(EventPayload::TaskDeleted(task.id).event_name(), "task:deleted");
        assert_eq!(
            EventPayload::TaskAssigned {
                task: task.clone(),
                assigned_by: Uuid::new_v4()
            }
            .event_name(),
            "task:assigned"
        );
        assert_eq!(
            EventPayload::TaskStatusChanged {
                task,
                changed_by: Uuid::new_v4()
            }
            .event_name(),
            "task:statusChanged"
        );
    }

    #[test]
    fn test_deleted_frame_carries_id_only() {
        let id = Uuid::new_v4();
        let frame = EventPayload::TaskDeleted(id).wire_frame();
        assert_eq!(frame["event"], "task:deleted");
        assert_eq!(frame["data"], id.to_string());
    }

    #[test]
    fn test_assigned_frame_carries_task_and_assigner() {
        let task = sample_task();
        let assigner = Uuid::new_v4();
        let frame = EventPayload::TaskAssigned {
            task: task.clone(),
            assigned_by: assigner,
        }
        .wire_frame();

        assert_eq!(frame["event"], "task:assigned");
        assert_eq!(frame["data"]["assignedBy"], assigner.to_string());
        assert_eq!(frame["data"]["task"]["id"], task.id.to_string());
    }

    #[tokio::test]
    async fn test_recording_fanout_preserves_order() {
        let fanout = RecordingFanout::new();
        let task = sample_task();

        fanout
            .deliver(DomainEvent::broadcast(EventPayload::TaskCreated(task.clone())))
            .await;
        fanout
            .deliver(DomainEvent::to_user(
                task.creator_id,
                EventPayload::TaskDeleted(task.id),
            ))
            .await;

        let events = fanout.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].payload.event_name(), "task:created");
        assert_eq!(events[1].payload.event_name(), "task:deleted");
        assert_eq!(events[1].target, EventTarget::User(task.creator_id));
    }
}
