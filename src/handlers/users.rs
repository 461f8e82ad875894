use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AuthUser, Permission, authorize},
    error::{ApiError, ErrorBody},
    extract::{ApiJson, ApiPath, ApiQuery},
    models::{AccountChanges, AccountProfile, AccountsPage, UpdateAccountRequest},
    search::pagination::{PageParams, PageRequest},
};

/// UserSearchParams
///
/// Query parameters of `GET /api/users/search`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserSearchParams {
    /// Matched case-insensitively against username, email and names.
    pub q: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

async fn accounts_page(
    state: &AppState,
    search: Option<&str>,
    page: PageRequest,
) -> Result<AccountsPage, ApiError> {
    let page = state
        .repo
        .list_accounts(search, page)
        .await?
        .map(AccountProfile::from);
    Ok(AccountsPage {
        users: page.items,
        pagination: page.meta,
    })
}

/// list_users
///
/// [Admin Route] All accounts, newest first.
#[utoipa::path(
    get,
    path = "/api/users",
    params(PageParams),
    responses(
        (status = 200, description = "Accounts", body = AccountsPage),
        (status = 403, description = "Forbidden", body = ErrorBody)
    )
)]
pub async fn list_users(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<AccountsPage>, ApiError> {
    authorize(&user, Permission::ViewAccounts)?;
    Ok(Json(accounts_page(&state, None, params.request()).await?))
}

/// search_users
///
/// [Admin Route] Accounts matching `q`.
#[utoipa::path(
    get,
    path = "/api/users/search",
    params(UserSearchParams),
    responses(
        (status = 200, description = "Matching accounts", body = AccountsPage),
        (status = 400, description = "Missing q", body = ErrorBody),
        (status = 403, description = "Forbidden", body = ErrorBody)
    )
)]
pub async fn search_users(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<UserSearchParams>,
) -> Result<Json<AccountsPage>, ApiError> {
    authorize(&user, Permission::ViewAccounts)?;
    let q = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::validation("Search query q is required"))?;
    let page = PageRequest::new(params.page, params.per_page);
    Ok(Json(accounts_page(&state, Some(q), page).await?))
}

/// get_user
///
/// [Authenticated Route] Admins may read any account; other callers only their own.
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account", body = AccountProfile),
        (status = 403, description = "Forbidden", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_user(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<AccountProfile>, ApiError> {
    if id != user.id {
        authorize(&user, Permission::ViewAccounts)?;
    }
    let account = state
        .repo
        .get_account(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(account.into()))
}

/// update_user
///
/// [Authenticated Route] Callers may edit their own names and email. Everything else
/// requires `ManageAccounts`:
///
/// 1. Editing another account.
/// 2. Changing `username` or `is_active`.
/// 3. Setting `password`. Users rotate their own password through `change_password`,
///    which checks the current one first.
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "Account ID")),
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Updated", body = AccountProfile),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 403, description = "Forbidden", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 409, description = "Username or email taken", body = ErrorBody)
    )
)]
pub async fn update_user(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateAccountRequest>,
) -> Result<Json<AccountProfile>, ApiError> {
    if id != user.id
        || payload.username.is_some()
        || payload.is_active.is_some()
        || payload.password.is_some()
    {
        authorize(&user, Permission::ManageAccounts)?;
    }
    payload.validate()?;

    let target = state
        .repo
        .get_account(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    if target.is_main_admin && payload.is_active == Some(false) {
        return Err(ApiError::validation("The main admin cannot be deactivated"));
    }

    let password_hash = match payload.password.as_deref() {
        Some(password) => Some(state.credentials.hash_password(password).await?),
        None => None,
    };
    let changes = AccountChanges {
        username: payload.username.map(|u| u.trim().to_string()),
        email: payload.email.map(|e| e.trim().to_string()),
        first_name: payload.first_name,
        last_name: payload.last_name,
        is_active: payload.is_active,
        password_hash,
    };

    let updated = state
        .repo
        .update_account(id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(updated.into()))
}

/// delete_user
///
/// [Admin Route] Removes an account. Self-deletion and deleting the main admin are rejected;
/// removing the last admin is forbidden.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "Account ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Self or main admin", body = ErrorBody),
        (status = 403, description = "Forbidden or last admin", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_user(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    authorize(&user, Permission::ManageAccounts)?;
    if id == user.id {
        return Err(ApiError::validation("You cannot delete your own account"));
    }

    let target = state
        .repo
        .get_account(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    if target.is_main_admin {
        return Err(ApiError::validation("The main admin cannot be deleted"));
    }

    if !state.repo.delete_account(id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    tracing::info!(account_id = %id, deleted_by = %user.id, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}
