use axum::{Json, extract::State, http::StatusCode};
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AuthUser, Permission, authorize},
    credentials::TokenKind,
    error::{ApiError, ErrorBody},
    extract::{ApiJson, ApiPath},
    models::{
        AccessTokenResponse, AccountChanges, AccountProfile, ChangePasswordRequest, LoginRequest,
        LoginResponse, MessageResponse, NewAccount, RefreshRequest, RegisterRequest, Role,
    },
};

/// register
///
/// [Public Route] Creates a `client` account. Admins are only created through
/// `create_admin` or the startup seed.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = AccountProfile),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 409, description = "Username or email taken", body = ErrorBody)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AccountProfile>), ApiError> {
    payload.validate()?;
    let account = create_account(&state, payload, Role::Client).await?;
    tracing::info!(account_id = %account.id, "account registered");
    Ok((StatusCode::CREATED, Json(account)))
}

async fn create_account(
    state: &AppState,
    payload: RegisterRequest,
    role: Role,
) -> Result<AccountProfile, ApiError> {
    let password_hash = state.credentials.hash_password(&payload.password).await?;
    let account = state
        .repo
        .create_account(NewAccount {
            username: payload.username.trim().to_string(),
            email: payload.email.trim().to_string(),
            password_hash,
            first_name: payload.first_name,
            last_name: payload.last_name,
            role,
            is_main_admin: false,
        })
        .await?;
    Ok(account.into())
}

/// login
///
/// [Public Route] Exchanges a username (or email) and password for an access/refresh pair.
/// Unknown accounts and wrong passwords get the same 401.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 403, description = "Account disabled", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let invalid = || ApiError::unauthorized("Invalid username or password");

    let account = state
        .repo
        .find_account_by_login(payload.username.trim())
        .await?
        .ok_or_else(invalid)?;

    if !state
        .credentials
        .verify_password(&payload.password, &account.password_hash)
        .await?
    {
        tracing::debug!(account_id = %account.id, "login rejected: wrong password");
        return Err(invalid());
    }
    if !account.is_active {
        return Err(ApiError::forbidden("Account is disabled"));
    }

    let access_token = state.credentials.issue_access(account.id)?;
    let refresh_token = state.credentials.issue_refresh(account.id)?;
    Ok(Json(LoginResponse {
        user: account.into(),
        access_token,
        refresh_token,
    }))
}

/// refresh
///
/// [Public Route] Issues a new access token for a valid refresh token.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 401, description = "Invalid refresh token", body = ErrorBody)
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    let claims = state
        .credentials
        .verify(&payload.refresh_token, TokenKind::Refresh)?;

    match state.repo.get_account(claims.sub).await? {
        Some(account) if account.is_active => Ok(Json(AccessTokenResponse {
            access_token: state.credentials.issue_access(account.id)?,
        })),
        _ => Err(ApiError::unauthorized("Account not found or disabled")),
    }
}

/// me
///
/// [Authenticated Route] The caller's own profile.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Profile", body = AccountProfile),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
pub async fn me(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AccountProfile>, ApiError> {
    let account = state
        .repo
        .get_account(user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(account.into()))
}

/// change_password
///
/// [Authenticated Route] The only way for users to change their own password.
///
/// 1. `new_password` is length-checked.
/// 2. `current_password` must verify against the stored hash, otherwise 401.
/// 3. The new hash replaces the old one; issued tokens stay valid.
#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "New password too short", body = ErrorBody),
        (status = 401, description = "Current password is wrong", body = ErrorBody)
    )
)]
pub async fn change_password(
    user: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate()?;

    let account = state
        .repo
        .get_account(user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    if !state
        .credentials
        .verify_password(&payload.current_password, &account.password_hash)
        .await?
    {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let password_hash = state.credentials.hash_password(&payload.new_password).await?;
    state
        .repo
        .update_account(
            user.id,
            AccountChanges {
                password_hash: Some(password_hash),
                ..AccountChanges::default()
            },
        )
        .await?;

    tracing::info!(account_id = %user.id, "password changed");
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

/// logout
///
/// [Authenticated Route] Tokens are stateless; the client discards them.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Logged out", body = MessageResponse))
)]
pub async fn logout(user: AuthUser) -> Json<MessageResponse> {
    tracing::debug!(account_id = %user.id, "logout");
    Json(MessageResponse::new("Logged out successfully"))
}

// --- Admin provisioning (main admin only) ---

/// list_admins
///
/// [Admin Route] Every admin account, the main admin first.
#[utoipa::path(
    get,
    path = "/api/auth/admins",
    responses(
        (status = 200, description = "Admins", body = [AccountProfile]),
        (status = 403, description = "Not the main admin", body = ErrorBody)
    )
)]
pub async fn list_admins(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AccountProfile>>, ApiError> {
    authorize(&user, Permission::ManageAccounts)?;
    let admins = state.repo.list_admins().await?;
    Ok(Json(admins.into_iter().map(AccountProfile::from).collect()))
}

/// create_admin
///
/// [Admin Route] Provisions a regular (non-main) admin.
#[utoipa::path(
    post,
    path = "/api/auth/admins",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Admin created", body = AccountProfile),
        (status = 403, description = "Not the main admin", body = ErrorBody),
        (status = 409, description = "Username or email taken", body = ErrorBody)
    )
)]
pub async fn create_admin(
    user: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AccountProfile>), ApiError> {
    authorize(&user, Permission::ManageAccounts)?;
    payload.validate()?;
    let admin = create_account(&state, payload, Role::Admin).await?;
    tracing::info!(admin_id = %admin.id, created_by = %user.id, "admin created");
    Ok((StatusCode::CREATED, Json(admin)))
}

/// delete_admin
///
/// [Admin Route] Removes an admin account. The main admin and the caller cannot be removed.
#[utoipa::path(
    delete,
    path = "/api/auth/admins/{id}",
    params(("id" = Uuid, Path, description = "Admin account ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Main admin or self", body = ErrorBody),
        (status = 403, description = "Not the main admin, or last admin", body = ErrorBody),
        (status = 404, description = "No such admin", body = ErrorBody)
    )
)]
pub async fn delete_admin(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    authorize(&user, Permission::ManageAccounts)?;

    let target = state
        .repo
        .get_account(id)
        .await?
        .filter(|a| a.role == Role::Admin)
        .ok_or_else(|| ApiError::not_found("Admin not found"))?;
    if target.id == user.id {
        return Err(ApiError::validation("You cannot delete your own account"));
    }
    if target.is_main_admin {
        return Err(ApiError::validation("The main admin cannot be deleted"));
    }

    if !state.repo.delete_account(id).await? {
        return Err(ApiError::not_found("Admin not found"));
    }
    tracing::info!(admin_id = %id, deleted_by = %user.id, "admin deleted");
    Ok(StatusCode::NO_CONTENT)
}
