use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AuthUser, Permission, authorize},
    error::{ApiError, ErrorBody},
    extract::{ApiJson, ApiPath, ApiQuery},
    models::{
        CreateInquiryRequest, InquiriesPage, Inquiry, InquiryFilter, InquiryStatus, NewInquiry,
        UpdateInquiryStatusRequest,
    },
    search::pagination::{PageParams, PageRequest},
};

/// InquiryListParams
///
/// Filters of `GET /api/contact`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InquiryListParams {
    pub status: Option<InquiryStatus>,
    pub property_id: Option<Uuid>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

async fn inquiries_page(
    state: &AppState,
    filter: InquiryFilter,
    page: PageRequest,
) -> Result<InquiriesPage, ApiError> {
    let page = state.repo.list_inquiries(&filter, page).await?;
    Ok(InquiriesPage {
        messages: page.items,
        pagination: page.meta,
    })
}

/// create_inquiry
///
/// [Public Route] Anyone may send an inquiry. A signed-in sender is recorded.
///
/// 1. The payload is validated (name, email and message are required).
/// 2. A `property_id`, when given, must name an existing listing. Unverified listings
///    count: the sender may have followed an older link.
/// 3. The inquiry is stored as `unread`.
///
/// *Note*: a listing deleted between step 2 and the insert is still reported as 404.
#[utoipa::path(
    post,
    path = "/api/contact",
    request_body = CreateInquiryRequest,
    responses(
        (status = 201, description = "Inquiry received", body = Inquiry),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 404, description = "Listing not found", body = ErrorBody)
    )
)]
pub async fn create_inquiry(
    user: Option<AuthUser>,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateInquiryRequest>,
) -> Result<(StatusCode, Json<Inquiry>), ApiError> {
    payload.validate()?;

    if let Some(listing_id) = payload.property_id {
        if state.repo.get_listing(listing_id).await?.is_none() {
            return Err(ApiError::not_found("Property not found"));
        }
    }

    let inquiry = state
        .repo
        .create_inquiry(NewInquiry {
            name: payload.name.trim().to_string(),
            email: payload.email.trim().to_string(),
            phone: payload.phone,
            subject: payload.subject,
            message: payload.message,
            listing_id: payload.property_id,
            sender_id: user.map(|u| u.id),
        })
        .await?;
    tracing::info!(inquiry_id = %inquiry.id, "inquiry received");
    Ok((StatusCode::CREATED, Json(inquiry)))
}

/// list_inquiries
///
/// [Admin Route] The inbox, newest first, optionally narrowed by status, listing or sender.
#[utoipa::path(
    get,
    path = "/api/contact",
    params(InquiryListParams),
    responses(
        (status = 200, description = "Inquiries", body = InquiriesPage),
        (status = 403, description = "Forbidden", body = ErrorBody)
    )
)]
pub async fn list_inquiries(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<InquiryListParams>,
) -> Result<Json<InquiriesPage>, ApiError> {
    authorize(&user, Permission::ManageInquiries)?;
    let filter = InquiryFilter {
        status: params.status,
        listing_id: params.property_id,
        sender_id: None,
    };
    let page = PageRequest::new(params.page, params.per_page);
    Ok(Json(inquiries_page(&state, filter, page).await?))
}

/// my_inquiries
///
/// [Authenticated Route] Inquiries sent by the caller while signed in.
#[utoipa::path(
    get,
    path = "/api/contact/my-messages",
    params(PageParams),
    responses((status = 200, description = "My inquiries", body = InquiriesPage))
)]
pub async fn my_inquiries(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<InquiriesPage>, ApiError> {
    let filter = InquiryFilter {
        sender_id: Some(user.id),
        ..InquiryFilter::default()
    };
    Ok(Json(inquiries_page(&state, filter, params.request()).await?))
}

/// get_inquiry
///
/// [Admin Route]
#[utoipa::path(
    get,
    path = "/api/contact/{id}",
    params(("id" = Uuid, Path, description = "Inquiry ID")),
    responses(
        (status = 200, description = "Inquiry", body = Inquiry),
        (status = 403, description = "Forbidden", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_inquiry(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Inquiry>, ApiError> {
    authorize(&user, Permission::ManageInquiries)?;
    let inquiry = state
        .repo
        .get_inquiry(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Message not found"))?;
    Ok(Json(inquiry))
}

/// update_inquiry_status
///
/// [Admin Route] Moves an inquiry between unread, read and replied.
#[utoipa::path(
    put,
    path = "/api/contact/{id}/status",
    params(("id" = Uuid, Path, description = "Inquiry ID")),
    request_body = UpdateInquiryStatusRequest,
    responses(
        (status = 200, description = "Updated", body = Inquiry),
        (status = 403, description = "Forbidden", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_inquiry_status(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateInquiryStatusRequest>,
) -> Result<Json<Inquiry>, ApiError> {
    authorize(&user, Permission::ManageInquiries)?;
    let inquiry = state
        .repo
        .set_inquiry_status(id, payload.status)
        .await?
        .ok_or_else(|| ApiError::not_found("Message not found"))?;
    Ok(Json(inquiry))
}

/// delete_inquiry
///
/// [Admin Route]
#[utoipa::path(
    delete,
    path = "/api/contact/{id}",
    params(("id" = Uuid, Path, description = "Inquiry ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Forbidden", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_inquiry(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    authorize(&user, Permission::ManageInquiries)?;
    if !state.repo.delete_inquiry(id).await? {
        return Err(ApiError::not_found("Message not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
