//! Session registry for the realtime layer.
//!
//! Maps each authenticated user to the set of their live connections. All
//! of a user's simultaneous connections (multiple browser tabs) share one
//! logical channel, so a targeted event reaches every tab. The map is the
//! only shared mutable structure in the realtime layer; the `RwLock` keeps
//! concurrent connects and disconnects from corrupting membership for
//! unrelated users.
//!
//! Entries are ephemeral - lost on server restart, rebuilt as clients
//! reconnect.

use std::collections::HashMap;

use axum::extract::ws::Message;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Registry of live, authenticated socket sessions.
///
/// Keyed by user id, then by session id, holding the sender half of each
/// connection's outbound message channel. Senders are unbounded so a
/// delivery never blocks the caller; a slow client's backlog lives in its
/// own channel.
pub struct SessionRegistry {
    channels: RwLock<HashMap<Uuid, HashMap<Uuid, mpsc::UnboundedSender<Message>>>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a session to the user's channel.
    pub async fn register(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        sender: mpsc::UnboundedSender<Message>,
    ) {
        let mut channels = self.channels.write().await;
        channels.entry(user_id).or_default().insert(session_id, sender);
    }

    /// Removes a session; drops the user's channel entry when it empties.
    pub async fn unregister(&self, user_id: Uuid, session_id: Uuid) {
        let mut channels = self.channels.write().await;
        if let Some(sessions) = channels.get_mut(&user_id) {
            sessions.remove(&session_id);
            if sessions.is_empty() {
                channels.remove(&user_id);
            }
        }
    }

    /// True if the user has at least one live session.
    pub async fn is_connected(&self, user_id: Uuid) -> bool {
        let channels = self.channels.read().await;
        channels.get(&user_id).is_some_and(|s| !s.is_empty())
    }

    /// Number of live sessions for the user.
    pub async fn session_count(&self, user_id: Uuid) -> usize {
        let channels = self.channels.read().await;
        channels.get(&user_id).map_or(0, HashMap::len)
    }

    /// Delivers a text frame to every live session of every user.
    ///
    /// Send failures (writer task already gone) are ignored; the reader
    /// loop cleans the session up on disconnect.
    pub async fn broadcast(&self, frame: String) {
        let channels = self.channels.read().await;
        for sessions in channels.values() {
            for sender in sessions.values() {
                let _ = sender.send(Message::Text(frame.clone()));
            }
        }
    }

    /// Delivers a text frame to one user's channel only.
    ///
    /// Silently dropped when the user has no live session - targeted events
    /// are at-most-once, best-effort, with no queuing.
    pub async fn send_to_user(&self, user_id: Uuid, frame: String) {
        let channels = self.channels.read().await;
        if let Some(sessions) = channels.get(&user_id) {
            for sender in sessions.values() {
                let _ = sender.send(Message::Text(frame.clone()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (
        mpsc::UnboundedSender<Message>,
        mpsc::UnboundedReceiver<Message>,
    ) {
        mpsc::unbounded_channel()
    }

    #[tokio::test]
    async fn register_and_unregister() {
        let registry = SessionRegistry::new();
        let user = Uuid::new_v4();
        let session = Uuid::new_v4();
        let (tx, _rx) = channel();

        registry.register(user, session, tx).await;
        assert!(registry.is_connected(user).await);

        registry.unregister(user, session).await;
        assert!(!registry.is_connected(user).await);
    }

    #[tokio::test]
    async fn multiple_tabs_share_one_channel() {
        let registry = SessionRegistry::new();
        let user = Uuid::new_v4();
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();

        registry.register(user, Uuid::new_v4(), tx1).await;
        registry.register(user, Uuid::new_v4(), tx2).await;
        assert_eq!(registry.session_count(user).await, 2);

        registry.send_to_user(user, "hello".to_string()).await;

        assert!(matches!(rx1.recv().await, Some(Message::Text(t)) if t == "hello"));
        assert!(matches!(rx2.recv().await, Some(Message::Text(t)) if t == "hello"));
    }

    #[tokio::test]
    async fn broadcast_reaches_every_user() {
        let registry = SessionRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();

        registry.register(Uuid::new_v4(), Uuid::new_v4(), tx1).await;
        registry.register(Uuid::new_v4(), Uuid::new_v4(), tx2).await;

        registry.broadcast("event".to_string()).await;

        assert!(rx1.recv().await.is_some());
        assert!(rx2.recv().await.is_some());
    }

    #[tokio::test]
    async fn targeted_send_skips_other_users() {
        let registry = SessionRegistry::new();
        let target = Uuid::new_v4();
        let bystander = Uuid::new_v4();
        let (tx_target, mut rx_target) = channel();
        let (tx_bystander, mut rx_bystander) = channel();

        registry.register(target, Uuid::new_v4(), tx_target).await;
        registry
            .register(bystander, Uuid::new_v4(), tx_bystander)
            .await;

        registry.send_to_user(target, "for you".to_string()).await;

        assert!(rx_target.recv().await.is_some());
        assert!(rx_bystander.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_to_offline_user_is_dropped() {
        let registry = SessionRegistry::new();
        // No session registered - the send is a silent no-op.
        registry
            .send_to_user(Uuid::new_v4(), "nobody home".to_string())
            .await;
    }

    #[tokio::test]
    async fn unregister_one_tab_keeps_the_channel() {
        let registry = SessionRegistry::new();
        let user = Uuid::new_v4();
        let session1 = Uuid::new_v4();
        let (tx1, _rx1) = channel();
        let (tx2, mut rx2) = channel();

        registry.register(user, session1, tx1).await;
        registry.register(user, Uuid::new_v4(), tx2).await;

        registry.unregister(user, session1).await;
        assert!(registry.is_connected(user).await);

        registry.send_to_user(user, "still here".to_string()).await;
        assert!(rx2.recv().await.is_some());
    }

    #[tokio::test]
    async fn unregister_unknown_session_is_harmless() {
        let registry = SessionRegistry::new();
        registry.unregister(Uuid::new_v4(), Uuid::new_v4()).await;
    }
}
