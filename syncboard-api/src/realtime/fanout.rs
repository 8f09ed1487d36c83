//! Websocket-backed implementation of the event fanout boundary.
//!
//! Bridges domain events produced by the lifecycle service to the session
//! registry: broadcast events go to every authenticated connection, targeted
//! events only to the named user's channel. Delivery pushes into unbounded
//! per-connection channels, so a slow or disconnected subscriber can never
//! delay or fail the mutation that produced the event.

use std::sync::Arc;

use async_trait::async_trait;

use syncboard_shared::events::{DomainEvent, EventFanout, EventTarget};

use super::registry::SessionRegistry;

/// [`EventFanout`] delivering wire frames through the [`SessionRegistry`].
pub struct WsFanout {
    registry: Arc<SessionRegistry>,
}

impl WsFanout {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl EventFanout for WsFanout {
    async fn deliver(&self, event: DomainEvent) {
        let frame = event.payload.wire_frame().to_string();

        match event.target {
            EventTarget::Broadcast => {
                tracing::debug!(event = event.payload.event_name(), "broadcasting event");
                self.registry.broadcast(frame).await;
            }
            EventTarget::User(user_id) => {
                tracing::debug!(
                    event = event.payload.event_name(),
                    user_id = %user_id,
                    "delivering targeted event"
                );
                self.registry.send_to_user(user_id, frame).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ws::Message;
    use chrono::Utc;
    use syncboard_shared::events::EventPayload;
    use syncboard_shared::models::task::{Task, TaskPriority, TaskStatus};
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn sample_task(creator: Uuid) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: "Wire fanout".to_string(),
            description: None,
            due_date: Utc::now(),
            priority: TaskPriority::Medium,
            status: TaskStatus::Todo,
            creator_id: creator,
            assigned_to_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn frame_event(msg: &Message) -> String {
        match msg {
            Message::Text(text) => {
                let value: serde_json::Value = serde_json::from_str(text).unwrap();
                value["event"].as_str().unwrap().to_string()
            }
            other => panic!("expected Text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn broadcast_event_reaches_all_connections() {
        let registry = Arc::new(SessionRegistry::new());
        let fanout = WsFanout::new(registry.clone());

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        registry.register(Uuid::new_v4(), Uuid::new_v4(), tx1).await;
        registry.register(Uuid::new_v4(), Uuid::new_v4(), tx2).await;

        let task = sample_task(Uuid::new_v4());
        fanout
            .deliver(DomainEvent::broadcast(EventPayload::TaskCreated(task)))
            .await;

        assert_eq!(frame_event(&rx1.recv().await.unwrap()), "task:created");
        assert_eq!(frame_event(&rx2.recv().await.unwrap()), "task:created");
    }

    #[tokio::test]
    async fn targeted_event_reaches_only_the_target_channel() {
        let registry = Arc::new(SessionRegistry::new());
        let fanout = WsFanout::new(registry.clone());

        let target = Uuid::new_v4();
        let bystander = Uuid::new_v4();
        let (tx_target, mut rx_target) = mpsc::unbounded_channel();
        let (tx_bystander, mut rx_bystander) = mpsc::unbounded_channel();
        registry.register(target, Uuid::new_v4(), tx_target).await;
        registry
            .register(bystander, Uuid::new_v4(), tx_bystander)
            .await;

        let task = sample_task(Uuid::new_v4());
        fanout
            .deliver(DomainEvent::to_user(
                target,
                EventPayload::TaskAssigned {
                    task,
                    assigned_by: Uuid::new_v4(),
                },
            ))
            .await;

        assert_eq!(frame_event(&rx_target.recv().await.unwrap()), "task:assigned");
        assert!(rx_bystander.try_recv().is_err());
    }

    #[tokio::test]
    async fn targeted_event_for_offline_user_is_dropped() {
        let registry = Arc::new(SessionRegistry::new());
        let fanout = WsFanout::new(registry);

        // Nobody is connected; deliver must neither fail nor block.
        fanout
            .deliver(DomainEvent::to_user(
                Uuid::new_v4(),
                EventPayload::TaskDeleted(Uuid::new_v4()),
            ))
            .await;
    }
}
