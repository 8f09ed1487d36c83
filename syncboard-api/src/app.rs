/// Application state and router builder
///
/// Defines the shared application state and builds the Axum router with all
/// routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use syncboard_api::app::{build_router, AppState};
/// use syncboard_api::config::Config;
/// use syncboard_shared::auth::verifier::JwtVerifier;
/// use syncboard_shared::events::NoopFanout;
/// use syncboard_shared::service::TaskService;
/// use syncboard_shared::store::memory::{MemoryTaskStore, MemoryUserDirectory};
/// use syncboard_api::realtime::registry::SessionRegistry;
///
/// # async fn example(config: Config) -> anyhow::Result<()> {
/// let users = Arc::new(MemoryUserDirectory::new());
/// let service = TaskService::new(
///     Arc::new(MemoryTaskStore::new()),
///     users.clone(),
///     Arc::new(NoopFanout),
/// );
/// let state = AppState::new(
///     service,
///     users,
///     Arc::new(SessionRegistry::new()),
///     Arc::new(JwtVerifier::new(config.jwt.secret.clone())),
///     config,
/// );
/// let app = build_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use syncboard_shared::auth::verifier::TokenVerifier;
use syncboard_shared::auth::AuthContext;
use syncboard_shared::service::TaskService;
use syncboard_shared::store::UserDirectory;

use crate::config::Config;
use crate::realtime::registry::SessionRegistry;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every
/// field is `Arc`-backed so the clone is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Task lifecycle service (store + user directory + fanout)
    pub service: TaskService,

    /// User directory, shared with the auth routes and socket handshake
    pub users: Arc<dyn UserDirectory>,

    /// Realtime session registry
    pub registry: Arc<SessionRegistry>,

    /// Token verification boundary
    pub verifier: Arc<dyn TokenVerifier>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state.
    pub fn new(
        service: TaskService,
        users: Arc<dyn UserDirectory>,
        registry: Arc<SessionRegistry>,
        verifier: Arc<dyn TokenVerifier>,
        config: Config,
    ) -> Self {
        Self {
            service,
            users,
            registry,
            verifier,
            config: Arc::new(config),
        }
    }

    /// JWT secret for token issuance.
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router.
///
/// # Routes
///
/// ```text
/// /
/// ├── /health                     # Health check (public)
/// └── /v1/
///     ├── /auth/                  # Authentication (public)
///     │   ├── POST /register
///     │   ├── POST /login
///     │   └── POST /refresh
///     ├── /tasks/                 # Task engine (bearer auth)
///     │   ├── POST   /
///     │   ├── GET    /            # filtered listing
///     │   ├── GET    /:id
///     │   ├── PUT    /:id
///     │   ├── DELETE /:id
///     │   ├── POST   /:id/assign
///     │   └── POST   /:id/status
///     ├── /dashboard/stats        # Aggregation (bearer auth)
///     └── /ws                     # Realtime socket (token in query)
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public, no bearer token required)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    // Task + dashboard routes (require bearer authentication)
    let task_routes = Router::new()
        .route("/tasks", post(routes::tasks::create_task))
        .route("/tasks", get(routes::tasks::list_tasks))
        .route("/tasks/:id", get(routes::tasks::get_task))
        .route("/tasks/:id", put(routes::tasks::update_task))
        .route("/tasks/:id", delete(routes::tasks::delete_task))
        .route("/tasks/:id/assign", post(routes::tasks::assign_task))
        .route("/tasks/:id/status", post(routes::tasks::change_status))
        .route("/dashboard/stats", get(routes::dashboard::get_stats))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            bearer_auth_layer,
        ));

    // The socket performs its own handshake auth (token query parameter).
    let ws_routes = Router::new().route("/ws", get(crate::realtime::socket::ws_handler));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(task_routes)
        .merge(ws_routes);

    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Bearer authentication middleware
///
/// Extracts and verifies the bearer token from the Authorization header,
/// then injects an [`AuthContext`] into request extensions. Handlers thread
/// the acting user from that context into every service call explicitly.
async fn bearer_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            crate::error::ApiError::AuthFailed("missing authorization header".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        crate::error::ApiError::AuthFailed("expected bearer token".to_string())
    })?;

    let verified = state.verifier.verify(token)?;

    req.extensions_mut().insert(AuthContext {
        user_id: verified.user_id,
    });

    Ok(next.run(req).await)
}
