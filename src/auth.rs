use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    credentials::{CredentialService, TokenKind},
    error::ApiError,
    models::{Account, Role},
    repository::RepositoryState,
};

/// Permission
///
/// Capabilities checked at the handler boundary. Roles map to a fixed set of these in
/// `permissions_of`; handlers never compare roles directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ManageListings,
    VerifyListings,
    ViewAllListings,
    ManageInquiries,
    ViewAccounts,
    ManageAccounts,
    ViewStats,
}

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ManageListings,
    Permission::VerifyListings,
    Permission::ViewAllListings,
    Permission::ManageInquiries,
    Permission::ViewAccounts,
    Permission::ViewStats,
];

const MAIN_ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ManageListings,
    Permission::VerifyListings,
    Permission::ViewAllListings,
    Permission::ManageInquiries,
    Permission::ViewAccounts,
    Permission::ManageAccounts,
    Permission::ViewStats,
];

/// The permission set of a role. The main admin flag only has meaning on admin accounts.
pub fn permissions_of(role: Role, is_main_admin: bool) -> &'static [Permission] {
    match (role, is_main_admin) {
        (Role::Client, _) => &[],
        (Role::Admin, false) => ADMIN_PERMISSIONS,
        (Role::Admin, true) => MAIN_ADMIN_PERMISSIONS,
    }
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Loaded from the account row on every
/// request, so role changes and deactivation take effect immediately.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub is_main_admin: bool,
}

impl AuthUser {
    pub fn can(&self, permission: Permission) -> bool {
        permissions_of(self.role, self.is_main_admin).contains(&permission)
    }
}

impl From<&Account> for AuthUser {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            role: account.role,
            is_main_admin: account.is_main_admin,
        }
    }
}

/// authorize
///
/// The single capability check used by every privileged handler.
pub fn authorize(user: &AuthUser, permission: Permission) -> Result<(), ApiError> {
    if user.can(permission) {
        Ok(())
    } else {
        tracing::debug!(user_id = %user.id, ?permission, "permission denied");
        Err(ApiError::forbidden("Insufficient permissions"))
    }
}

/// Optional-caller variant: anonymous callers hold no permissions.
pub fn caller_can(user: Option<&AuthUser>, permission: Permission) -> bool {
    user.is_some_and(|u| u.can(permission))
}

/// AuthUser extractor
///
/// Resolution order:
/// 1. `Env::Local` only: an `x-user-id` header naming an existing account.
/// 2. `Authorization: Bearer <access token>`.
///
/// The account must exist and be active. Every failure rejects with 401.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
    CredentialService: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            if let Some(user_id) = parts
                .headers
                .get("x-user-id")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| Uuid::parse_str(s).ok())
            {
                if let Some(account) = repo.get_account(user_id).await? {
                    if account.is_active {
                        return Ok(AuthUser::from(&account));
                    }
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

        let credentials = CredentialService::from_ref(state);
        let claims = credentials.verify(token, TokenKind::Access)?;

        match repo.get_account(claims.sub).await? {
            Some(account) if account.is_active => Ok(AuthUser::from(&account)),
            Some(_) => Err(ApiError::unauthorized("Account is disabled")),
            None => Err(ApiError::unauthorized("Account not found")),
        }
    }
}

/// Optional AuthUser extractor
///
/// For public endpoints that behave differently for signed-in callers. A missing, invalid
/// or expired credential yields `None`: the request proceeds anonymously.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
    CredentialService: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let has_credential = parts.headers.contains_key(header::AUTHORIZATION)
            || parts.headers.contains_key("x-user-id");
        if !has_credential {
            return Ok(None);
        }
        Ok(<AuthUser as FromRequestParts<S>>::from_request_parts(parts, state)
            .await
            .ok())
    }
}
