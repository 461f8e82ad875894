use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{config::AppConfig, error::ApiError};

/// TokenKind
///
/// Access tokens authenticate requests; refresh tokens are only accepted by
/// `POST /api/auth/refresh`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims
///
/// The signed payload of every bearer token issued by this service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the account id.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    pub kind: TokenKind,
}

/// CredentialService
///
/// Password hashing (bcrypt) and token issuance/verification (HS256 JWT). Cloned into
/// `AppState`; the keys are behind an `Arc`.
#[derive(Clone)]
pub struct CredentialService {
    keys: Arc<Keys>,
    bcrypt_cost: u32,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl CredentialService {
    pub fn new(config: &AppConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
            }),
            bcrypt_cost: config.bcrypt_cost,
            access_ttl_secs: config.access_token_ttl_secs,
            refresh_ttl_secs: config.refresh_token_ttl_secs,
        }
    }

    /// hash_password
    ///
    /// bcrypt is CPU bound, so it runs on the blocking pool.
    pub async fn hash_password(&self, password: &str) -> Result<String, ApiError> {
        let password = password.to_owned();
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| ApiError::internal(format!("hash task failed: {e}")))?
            .map_err(|e| ApiError::internal(format!("bcrypt hash failed: {e}")))
    }

    /// Returns `false` for a wrong password and for a malformed stored hash.
    pub async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, ApiError> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| ApiError::internal(format!("verify task failed: {e}")))?;
        match verified {
            Ok(ok) => Ok(ok),
            Err(e) => {
                tracing::warn!("stored password hash could not be verified: {}", e);
                Ok(false)
            }
        }
    }

    pub fn issue_access(&self, account_id: Uuid) -> Result<String, ApiError> {
        self.issue(account_id, TokenKind::Access, self.access_ttl_secs)
    }

    pub fn issue_refresh(&self, account_id: Uuid) -> Result<String, ApiError> {
        self.issue(account_id, TokenKind::Refresh, self.refresh_ttl_secs)
    }

    fn issue(&self, account_id: Uuid, kind: TokenKind, ttl_secs: u64) -> Result<String, ApiError> {
        let now = Utc::now().timestamp().max(0) as usize;
        let claims = Claims {
            sub: account_id,
            iat: now,
            exp: now + ttl_secs as usize,
            kind,
        };
        encode(&Header::default(), &claims, &self.keys.encoding)
            .map_err(|e| ApiError::internal(format!("token encoding failed: {e}")))
    }

    /// verify
    ///
    /// Decodes a token and checks its signature, expiry and kind. Every failure is a 401.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        // Expiry is exact: a token issued with a zero TTL is already expired.
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.keys.decoding, &validation).map_err(|e| {
            tracing::debug!("token rejected: {:?}", e.kind());
            ApiError::unauthorized("Invalid or expired token")
        })?;

        if data.claims.kind != expected {
            return Err(ApiError::unauthorized("Invalid token type"));
        }
        Ok(data.claims)
    }
}
