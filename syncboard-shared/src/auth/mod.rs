/// Authentication utilities
///
/// - `jwt`: HS256 token creation and validation (access + refresh)
/// - `password`: Argon2id hashing and strength checks
/// - `verifier`: the `TokenVerifier` boundary consumed by the HTTP
///   middleware and the realtime handshake

pub mod jwt;
pub mod password;
pub mod verifier;

use uuid::Uuid;

/// Authenticated request identity.
///
/// Threaded explicitly from the auth middleware into handlers (via request
/// extensions) and from handlers into the service as a plain argument,
/// never as an ambient property of the request.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,
}
