/// Common test utilities for integration tests
///
/// Builds a fully wired application (router + state) on top of the
/// in-memory stores, so integration tests run without Postgres. The session
/// registry and task service are shared between the returned router and any
/// live server spawned from the same context, which lets a test drive REST
/// mutations in-process while websocket clients are connected to the live
/// listener.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use uuid::Uuid;

use syncboard_api::app::{build_router, AppState};
use syncboard_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig};
use syncboard_api::realtime::fanout::WsFanout;
use syncboard_api::realtime::registry::SessionRegistry;
use syncboard_shared::auth::jwt::{create_token, Claims, TokenType};
use syncboard_shared::auth::verifier::JwtVerifier;
use syncboard_shared::models::user::{NewUser, User, UserRole};
use syncboard_shared::service::TaskService;
use syncboard_shared::store::memory::{MemoryTaskStore, MemoryUserDirectory};

/// Signing secret shared by test tokens and the test verifier.
pub const JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Test context containing the wired application.
pub struct TestContext {
    pub app: Router,
    pub state: AppState,
}

impl TestContext {
    /// Creates a fresh application over empty in-memory stores.
    pub fn new() -> Self {
        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                // Unused: integration tests run on the in-memory stores.
                url: String::new(),
                max_connections: 1,
            },
            jwt: JwtConfig {
                secret: JWT_SECRET.to_string(),
            },
        };

        let registry = Arc::new(SessionRegistry::new());
        let users = Arc::new(MemoryUserDirectory::new());
        let service = TaskService::new(
            Arc::new(MemoryTaskStore::new()),
            users.clone(),
            Arc::new(WsFanout::new(registry.clone())),
        );
        let state = AppState::new(
            service,
            users,
            registry,
            Arc::new(JwtVerifier::new(JWT_SECRET)),
            config,
        );
        let app = build_router(state.clone());

        Self { app, state }
    }

    /// Creates a user directly in the directory, bypassing the register
    /// endpoint.
    pub async fn create_user(&self, email: &str) -> User {
        use syncboard_shared::store::UserDirectory as _;
        self.state
            .users
            .create(NewUser {
                email: email.to_string(),
                name: None,
                role: UserRole::Member,
                password_hash: "test-hash".to_string(),
            })
            .await
            .expect("failed to create test user")
    }

    /// Mints a valid access token for a user.
    pub fn token_for(&self, user_id: Uuid) -> String {
        create_token(&Claims::new(user_id, TokenType::Access), JWT_SECRET)
            .expect("failed to create test token")
    }

    /// Mints an access token with a custom lifetime (negative = expired).
    pub fn token_with_lifetime(&self, user_id: Uuid, lifetime: chrono::Duration) -> String {
        create_token(
            &Claims::with_expiration(user_id, TokenType::Access, lifetime),
            JWT_SECRET,
        )
        .expect("failed to create test token")
    }

    /// `Authorization` header value for a token.
    pub fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    /// Binds the application to an OS-assigned port and serves it in the
    /// background. The returned address shares this context's state.
    pub async fn spawn_server(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test listener");
        let addr = listener.local_addr().expect("listener has no local addr");
        let app = self.app.clone();

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("test server error: {e}");
            }
        });

        addr
    }
}
