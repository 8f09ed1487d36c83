/// Dashboard endpoint
///
/// `GET /v1/dashboard/stats` - the seven per-user counters, computed fresh
/// on every call (no caching layer).

use axum::{extract::State, Extension, Json};

use syncboard_shared::auth::AuthContext;
use syncboard_shared::stats::DashboardStats;

use crate::app::AppState;
use crate::error::ApiResult;

/// Returns the authenticated user's dashboard counters.
pub async fn get_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<DashboardStats>> {
    let stats = state.service.dashboard(auth.user_id).await?;
    Ok(Json(stats))
}
