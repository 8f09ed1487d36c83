/// Token verification boundary
///
/// The realtime registry and the HTTP auth middleware both resolve bearer
/// tokens through [`TokenVerifier`] rather than calling the JWT functions
/// directly, so tests can substitute their own verifier and the signing
/// mechanics stay swappable.
///
/// Verification is synchronous by design: the socket handshake is abandoned
/// immediately if the token cannot be validated against the signing secret,
/// with no retry loop.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};

/// Outcome of a successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedToken {
    /// The authenticated user
    pub user_id: Uuid,

    /// When the token (and any session built on it) expires
    pub expires_at: DateTime<Utc>,
}

/// Why a token was rejected.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// The token's expiry instant has passed
    #[error("token expired")]
    Expired,

    /// Bad signature, malformed token, wrong token type, wrong issuer
    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Boundary for resolving a bearer token to a user identity and expiry.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<VerifiedToken, VerifyError>;
}

/// [`TokenVerifier`] backed by the HS256 JWT implementation.
pub struct JwtVerifier {
    secret: String,
}

impl JwtVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<VerifiedToken, VerifyError> {
        let claims = validate_access_token(token, &self.secret).map_err(|e| match e {
            JwtError::Expired => VerifyError::Expired,
            other => VerifyError::Invalid(other.to_string()),
        })?;

        Ok(VerifiedToken {
            user_id: claims.sub,
            expires_at: claims.expires_at(),
        })
    }
}
