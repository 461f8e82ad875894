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
        AddImagesRequest, CreateListingRequest, ListingResponse, ListingSearchResponse,
        ListingsPage, UpdateListingRequest, VerifyListingRequest,
    },
    search::{
        self, assembler,
        pagination::PageParams,
        predicate::{ListingFilters, ListingQuery, Predicate},
    },
    storage,
};

/// ShowAllParams
///
/// `show_all` is honoured only for callers allowed to view all listings.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ShowAllParams {
    pub show_all: Option<bool>,
}

/// list_listings
///
/// [Public Route] Filtered, paginated listings. Anonymous callers and callers without
/// `show_all` only see verified listings.
///
/// Filters are validated before the store is touched: negative prices or bedroom counts
/// and prices beyond `MAX_PRICE` are a 400.
#[utoipa::path(
    get,
    path = "/api/properties",
    params(ListingFilters),
    responses(
        (status = 200, description = "A page of listings", body = ListingsPage),
        (status = 400, description = "Invalid filter", body = ErrorBody)
    )
)]
pub async fn list_listings(
    user: Option<AuthUser>,
    State(state): State<AppState>,
    ApiQuery(filters): ApiQuery<ListingFilters>,
) -> Result<Json<ListingsPage>, ApiError> {
    let page = search::search_listings(state.repo.as_ref(), &filters, user.as_ref()).await?;
    Ok(Json(page))
}

/// search_listings
///
/// [Public Route] Same as `list_listings`, echoing the applied filters.
#[utoipa::path(
    get,
    path = "/api/properties/search",
    params(ListingFilters),
    responses(
        (status = 200, description = "Search results", body = ListingSearchResponse),
        (status = 400, description = "Invalid filter", body = ErrorBody)
    )
)]
pub async fn search_listings(
    user: Option<AuthUser>,
    State(state): State<AppState>,
    ApiQuery(filters): ApiQuery<ListingFilters>,
) -> Result<Json<ListingSearchResponse>, ApiError> {
    let page = search::search_listings(state.repo.as_ref(), &filters, user.as_ref()).await?;
    Ok(Json(ListingSearchResponse {
        properties: page.properties,
        pagination: page.pagination,
        search_criteria: filters.applied(),
    }))
}

/// get_listing
///
/// [Public Route] One listing. A listing hidden by the visibility rule is a 404.
#[utoipa::path(
    get,
    path = "/api/properties/{id}",
    params(("id" = Uuid, Path, description = "Listing ID"), ShowAllParams),
    responses(
        (status = 200, description = "Found", body = ListingResponse),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_listing(
    user: Option<AuthUser>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(params): ApiQuery<ShowAllParams>,
) -> Result<Json<ListingResponse>, ApiError> {
    let record = search::find_visible_listing(
        state.repo.as_ref(),
        id,
        user.as_ref(),
        params.show_all.unwrap_or(false),
    )
    .await?;
    Ok(Json(assembler::assemble(record)))
}

/// my_listings
///
/// [Authenticated Route] Listings owned by the caller, in every status and verification state.
#[utoipa::path(
    get,
    path = "/api/me/properties",
    params(PageParams),
    responses((status = 200, description = "My listings", body = ListingsPage))
)]
pub async fn my_listings(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<ListingsPage>, ApiError> {
    let query = ListingQuery::new().and(Predicate::OwnedBy(user.id));
    let page = state.repo.search_listings(&query, params.request()).await?;
    Ok(Json(assembler::assemble_page(page)))
}

/// create_listing
///
/// [Admin Route] Creates a listing owned by the caller.
///
/// 1. Requires `ManageListings`.
/// 2. `validate()` trims the text fields and rounds the price to cents.
/// 3. The row is stored with `is_verified = false`; it stays out of public results until
///    an admin verifies it.
///
/// *Note*: if the caller's account is deleted mid-request the owner reference no longer
/// resolves and the result is a 404.
#[utoipa::path(
    post,
    path = "/api/properties",
    request_body = CreateListingRequest,
    responses(
        (status = 201, description = "Created", body = ListingResponse),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 403, description = "Forbidden", body = ErrorBody)
    )
)]
pub async fn create_listing(
    user: AuthUser,
    State(state): State<AppState>,
    ApiJson(mut payload): ApiJson<CreateListingRequest>,
) -> Result<(StatusCode, Json<ListingResponse>), ApiError> {
    authorize(&user, Permission::ManageListings)?;
    payload.validate()?;

    let record = state.repo.create_listing(user.id, payload).await?;
    tracing::info!(listing_id = %record.id, owner_id = %user.id, "listing created");
    Ok((StatusCode::CREATED, Json(assembler::assemble(record))))
}

/// update_listing
///
/// [Admin Route] Partial update. The listing becomes unverified unless the payload sets
/// `is_verified`, which additionally needs `VerifyListings`.
///
/// Absent fields are left alone. A blank `description`, `address` or `lot_size` clears
/// the stored value.
#[utoipa::path(
    put,
    path = "/api/properties/{id}",
    params(("id" = Uuid, Path, description = "Listing ID")),
    request_body = UpdateListingRequest,
    responses(
        (status = 200, description = "Updated", body = ListingResponse),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 403, description = "Forbidden", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_listing(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(mut payload): ApiJson<UpdateListingRequest>,
) -> Result<Json<ListingResponse>, ApiError> {
    authorize(&user, Permission::ManageListings)?;
    if payload.is_verified.is_some() {
        authorize(&user, Permission::VerifyListings)?;
    }
    payload.validate()?;

    let record = state
        .repo
        .update_listing(id, payload)
        .await?
        .ok_or_else(|| ApiError::not_found("Property not found"))?;
    Ok(Json(assembler::assemble(record)))
}

/// delete_listing
///
/// [Admin Route] Deletes the listing and its favorites. Inquiries about it survive with no
/// listing reference.
///
/// *Note*: images under our bucket are removed after the row is gone. A storage failure
/// there is logged, not returned: the listing is already deleted.
#[utoipa::path(
    delete,
    path = "/api/properties/{id}",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Forbidden", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_listing(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    authorize(&user, Permission::ManageListings)?;

    let deleted = state
        .repo
        .delete_listing(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Property not found"))?;

    let images = assembler::decode_string_list(deleted.images.as_deref(), "images", id);
    for key in images
        .iter()
        .filter_map(|url| storage::key_from_url(&state.config.public_asset_url, url))
    {
        if let Err(e) = state.storage.delete(&key).await {
            tracing::warn!(listing_id = %id, "could not delete image {}: {}", key, e);
        }
    }

    tracing::info!(listing_id = %id, deleted_by = %user.id, "listing deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// verify_listing
///
/// [Admin Route] Sets the verification flag and notes.
#[utoipa::path(
    put,
    path = "/api/properties/{id}/verify",
    params(("id" = Uuid, Path, description = "Listing ID")),
    request_body = VerifyListingRequest,
    responses(
        (status = 200, description = "Verification updated", body = ListingResponse),
        (status = 403, description = "Forbidden", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn verify_listing(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<VerifyListingRequest>,
) -> Result<Json<ListingResponse>, ApiError> {
    authorize(&user, Permission::VerifyListings)?;

    let record = state
        .repo
        .set_verification(id, payload.is_verified, payload.verification_notes)
        .await?
        .ok_or_else(|| ApiError::not_found("Property not found"))?;
    tracing::info!(
        listing_id = %id,
        verified = record.is_verified,
        "listing verification changed"
    );
    Ok(Json(assembler::assemble(record)))
}

/// add_images
///
/// [Admin Route] Appends image URLs. The listing becomes unverified.
#[utoipa::path(
    post,
    path = "/api/properties/{id}/images",
    params(("id" = Uuid, Path, description = "Listing ID")),
    request_body = AddImagesRequest,
    responses(
        (status = 200, description = "Images added", body = ListingResponse),
        (status = 400, description = "No images", body = ErrorBody),
        (status = 403, description = "Forbidden", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn add_images(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<AddImagesRequest>,
) -> Result<Json<ListingResponse>, ApiError> {
    authorize(&user, Permission::ManageListings)?;
    payload.validate()?;

    let record = state
        .repo
        .append_images(id, payload.image_urls)
        .await?
        .ok_or_else(|| ApiError::not_found("Property not found"))?;
    Ok(Json(assembler::assemble(record)))
}
