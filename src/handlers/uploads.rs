use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::{AuthUser, Permission, authorize},
    error::{ApiError, ErrorBody},
    models::{UploadedFile, UploadedFiles},
    storage::{self, UploadPolicy},
};

struct PendingFile {
    filename: String,
    content_type: String,
    extension: String,
    bytes: Vec<u8>,
}

/// Reads every multipart field named `field_name`, validating each file against `policy`.
async fn read_files(
    multipart: &mut Multipart,
    field_name: &str,
    policy: &UploadPolicy,
) -> Result<Vec<PendingFile>, ApiError> {
    let mut files = Vec::new();
    let mut total = 0usize;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(field_name) {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|f| !f.is_empty())
            .ok_or_else(|| ApiError::validation("No file selected"))?;
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await?;

        let extension = policy.validate(&filename, bytes.len())?;
        total += bytes.len();
        if files.len() + 1 > policy.max_files {
            return Err(ApiError::validation(format!(
                "At most {} files may be uploaded at once",
                policy.max_files
            )));
        }
        if total > policy.max_total_bytes {
            return Err(ApiError::validation(format!(
                "Total upload size exceeds {} bytes",
                policy.max_total_bytes
            )));
        }

        files.push(PendingFile {
            filename,
            content_type,
            extension,
            bytes: bytes.to_vec(),
        });
    }
    Ok(files)
}

async fn store_file(state: &AppState, file: PendingFile) -> Result<UploadedFile, ApiError> {
    let key = storage::object_key(&file.filename, &file.extension);
    let size = file.bytes.len() as u64;
    state
        .storage
        .store(&key, file.bytes, &file.content_type)
        .await
        .map_err(|e| ApiError::internal(format!("storage error for {key}: {e}")))?;
    Ok(UploadedFile {
        file_url: storage::public_url(&state.config.public_asset_url, &key),
        key,
        filename: file.filename,
        size,
    })
}

/// upload_file
///
/// [Admin Route] Stores one image from the multipart field `file`.
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content_type = "multipart/form-data", description = "Field `file`"),
    responses(
        (status = 201, description = "Stored", body = UploadedFile),
        (status = 400, description = "Missing, oversized or disallowed file", body = ErrorBody),
        (status = 403, description = "Forbidden", body = ErrorBody)
    )
)]
pub async fn upload_file(
    user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadedFile>), ApiError> {
    authorize(&user, Permission::ManageListings)?;

    let policy = UploadPolicy {
        max_files: 1,
        ..state.config.upload.clone()
    };
    let file = read_files(&mut multipart, "file", &policy)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::validation("No file provided"))?;

    let uploaded = store_file(&state, file).await?;
    tracing::info!(key = %uploaded.key, size = uploaded.size, "file uploaded");
    Ok((StatusCode::CREATED, Json(uploaded)))
}

/// upload_multiple
///
/// [Admin Route] Stores every image in the multipart fields `files`. All files are validated
/// before any is stored; if storing fails midway, the files already stored are removed.
#[utoipa::path(
    post,
    path = "/api/upload/multiple",
    request_body(content_type = "multipart/form-data", description = "Fields `files`"),
    responses(
        (status = 201, description = "Stored", body = UploadedFiles),
        (status = 400, description = "Missing, oversized or disallowed files", body = ErrorBody),
        (status = 403, description = "Forbidden", body = ErrorBody)
    )
)]
pub async fn upload_multiple(
    user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadedFiles>), ApiError> {
    authorize(&user, Permission::ManageListings)?;

    let pending = read_files(&mut multipart, "files", &state.config.upload).await?;
    if pending.is_empty() {
        return Err(ApiError::validation("No files provided"));
    }

    let mut stored: Vec<UploadedFile> = Vec::with_capacity(pending.len());
    for file in pending {
        match store_file(&state, file).await {
            Ok(uploaded) => stored.push(uploaded),
            Err(e) => {
                for done in &stored {
                    if let Err(cleanup) = state.storage.delete(&done.key).await {
                        tracing::warn!("could not remove {} after failed upload: {}", done.key, cleanup);
                    }
                }
                return Err(e);
            }
        }
    }

    let total_size = stored.iter().map(|f| f.size).sum();
    tracing::info!(count = stored.len(), total_size, "files uploaded");
    Ok((
        StatusCode::CREATED,
        Json(UploadedFiles {
            total_files: stored.len(),
            total_size,
            files: stored,
        }),
    ))
}
