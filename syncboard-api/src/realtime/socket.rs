//! Websocket endpoint: handshake authentication and connection lifecycle.
//!
//! A connection moves through `Connecting → Authenticating → Authenticated →
//! Disconnected`. The client supplies a bearer token as a query parameter at
//! connect time; the token is verified (signature + expiry) and resolved to
//! a user identity *before* the upgrade completes. Any failure rejects the
//! handshake with 401 - there is no explicit "authenticated" acknowledgment;
//! the absence of a rejection is the success signal.
//!
//! An authenticated connection joins its user's channel in the registry and
//! stays there until it disconnects or its token's expiry instant passes, at
//! which point the server force-closes it.

use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Query, State},
    response::Response,
};
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

use super::registry::SessionRegistry;

/// Query parameters accepted by the socket handshake.
#[derive(Debug, Deserialize)]
pub struct SocketParams {
    /// Bearer access token; required.
    pub token: Option<String>,
}

/// Upgrades an HTTP request to an authenticated websocket connection.
///
/// # Errors
///
/// Responds 401 `auth_failed` when the token is missing, invalid, expired,
/// or resolves to an unknown user. A rejected connection never enters the
/// session registry.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<SocketParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let token = params
        .token
        .ok_or_else(|| ApiError::AuthFailed("missing auth token".to_string()))?;

    let verified = state.verifier.verify(&token)?;

    // Resolve the identity through the user directory; a token for a
    // deleted account does not authenticate.
    let user = state
        .users
        .find_by_id(verified.user_id)
        .await?
        .ok_or_else(|| ApiError::AuthFailed("unknown user".to_string()))?;

    tracing::info!(user_id = %user.id, "socket authenticated");

    let registry = state.registry.clone();
    Ok(ws.on_upgrade(move |socket| {
        handle_socket(socket, registry, user.id, verified.expires_at)
    }))
}

/// Runs one authenticated connection until disconnect or token expiry.
///
/// The connection lifecycle:
/// 1. Register the session in the user's channel.
/// 2. Spawn a writer task forwarding channel messages to the socket.
/// 3. Spawn a reader task that only watches for the close frame (clients
///    do not send domain messages; mutations go through the REST API).
/// 4. Race reader, writer, and the token-expiry timer.
/// 5. Unregister the session.
pub async fn handle_socket(
    socket: WebSocket,
    registry: Arc<SessionRegistry>,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
) {
    let session_id = Uuid::new_v4();
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    registry.register(user_id, session_id, tx.clone()).await;

    tracing::info!(user_id = %user_id, session_id = %session_id, "session registered");

    // Writer: drain the channel into the socket.
    let writer_user = user_id;
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let is_close = matches!(msg, Message::Close(_));
            if ws_sender.send(msg).await.is_err() {
                tracing::debug!(user_id = %writer_user, "websocket write failed");
                break;
            }
            if is_close {
                break;
            }
        }
    });

    // Reader: detect disconnect; inbound frames carry no domain meaning.
    let reader_user = user_id;
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Close(_) => {
                    tracing::debug!(user_id = %reader_user, "received close frame");
                    break;
                }
                _ => {
                    // Ignore text, binary, ping, pong frames.
                }
            }
        }
    });

    // Force-close at the token's expiry instant.
    let remaining = (expires_at - Utc::now())
        .to_std()
        .unwrap_or(std::time::Duration::ZERO);
    let expiry = tokio::time::sleep(remaining);
    tokio::pin!(expiry);

    tokio::select! {
        _ = &mut read_task => {
            write_task.abort();
        }
        _ = &mut write_task => {
            read_task.abort();
        }
        _ = &mut expiry => {
            tracing::info!(user_id = %user_id, session_id = %session_id, "token expired, closing session");
            // Remove the registry's sender first so no further events land,
            // then flush a close frame through our own handle.
            registry.unregister(user_id, session_id).await;
            let _ = tx.send(Message::Close(None));
            drop(tx);
            read_task.abort();
            let _ = write_task.await;
            tracing::info!(user_id = %user_id, session_id = %session_id, "session force-closed");
            return;
        }
    }

    registry.unregister(user_id, session_id).await;
    tracing::info!(user_id = %user_id, session_id = %session_id, "session disconnected");
}
