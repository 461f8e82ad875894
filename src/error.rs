use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

/// StoreError
///
/// Failures reported by a `Repository` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write (username, email, favorite pair).
    #[error("{0}")]
    Conflict(String),

    /// A foreign key points at a row that does not exist (or vanished mid-request).
    #[error("{0}")]
    MissingReference(String),

    /// The mutation would leave the system without any admin account.
    #[error("cannot delete the last admin account")]
    LastAdmin,

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let message = match db_err.constraint() {
                    Some("accounts_username_key") => "Username already exists",
                    Some("accounts_email_key") => "Email already exists",
                    Some("favorites_pkey") => "Property is already in favorites",
                    _ => "Record already exists",
                };
                return StoreError::Conflict(message.to_string());
            }
            if db_err.is_foreign_key_violation() {
                let message = match db_err.constraint() {
                    Some("listings_owner_id_fkey") => "Owner account not found",
                    Some("favorites_listing_id_fkey" | "inquiries_listing_id_fkey") => {
                        "Property not found"
                    }
                    Some("favorites_account_id_fkey" | "inquiries_sender_id_fkey") => {
                        "Account not found"
                    }
                    _ => "Referenced record not found",
                };
                return StoreError::MissingReference(message.to_string());
            }
        }
        StoreError::Database(err)
    }
}

/// ApiError
///
/// Every failure leaving a handler. Converted into the uniform envelope
/// `{"error", "message", "status_code"}` by `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    /// Also used for records hidden by the visibility policy.
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Detail is logged, never returned to the caller.
    #[error("internal error: {0}")]
    Internal(String),
}

/// ErrorBody
///
/// The JSON envelope returned for every error response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct ErrorBody {
    /// Machine-readable category, e.g. `not_found`.
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn body(&self) -> ErrorBody {
        let message = match self {
            Self::Internal(_) => "An unexpected error occurred".to_string(),
            other => other.to_string(),
        };
        ErrorBody {
            error: self.category().to_string(),
            message,
            status_code: self.status_code().as_u16(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            tracing::error!("internal error: {}", detail);
        }
        (self.status_code(), Json(self.body())).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => Self::Conflict(message),
            StoreError::MissingReference(message) => Self::NotFound(message),
            StoreError::LastAdmin => Self::Forbidden(err.to_string()),
            StoreError::Database(e) => Self::Internal(e.to_string()),
        }
    }
}

// --- Extractor rejections ---

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::Validation(err.body_text())
    }
}
