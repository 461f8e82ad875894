use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::{AuthUser, Permission, authorize},
    error::{ApiError, ErrorBody},
    models::DashboardStats,
};

/// get_stats
///
/// [Admin Route] Dashboard counters.
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Stats", body = DashboardStats),
        (status = 403, description = "Forbidden", body = ErrorBody)
    )
)]
pub async fn get_stats(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, ApiError> {
    authorize(&user, Permission::ViewStats)?;
    Ok(Json(state.repo.get_stats().await?))
}
