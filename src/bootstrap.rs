use crate::{
    config::AppConfig,
    credentials::CredentialService,
    error::ApiError,
    models::{NewAccount, Role},
    repository::Repository,
};

/// ensure_main_admin
///
/// Creates the configured main admin unless an account with that username already exists.
/// Returns whether an account was created. Without `MAIN_ADMIN_*` configured this is a no-op.
pub async fn ensure_main_admin(
    repo: &dyn Repository,
    credentials: &CredentialService,
    config: &AppConfig,
) -> Result<bool, ApiError> {
    let Some(seed) = &config.main_admin else {
        return Ok(false);
    };

    if let Some(existing) = repo.find_account_by_login(&seed.username).await? {
        if existing.role != Role::Admin || !existing.is_main_admin {
            tracing::warn!(
                "account {} exists but is not the main admin; leaving it unchanged",
                existing.username
            );
        }
        return Ok(false);
    }

    let password_hash = credentials.hash_password(&seed.password).await?;
    let account = repo
        .create_account(NewAccount {
            username: seed.username.clone(),
            email: seed.email.clone(),
            password_hash,
            first_name: None,
            last_name: None,
            role: Role::Admin,
            is_main_admin: true,
        })
        .await?;

    tracing::info!(account_id = %account.id, "main admin {} created", account.username);
    Ok(true)
}
