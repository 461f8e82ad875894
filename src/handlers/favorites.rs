use axum::{Json, extract::State, http::StatusCode};
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AuthUser, Permission},
    error::{ApiError, ErrorBody},
    extract::{ApiJson, ApiPath, ApiQuery},
    models::{AddFavoriteRequest, FavoriteAdded, FavoriteStatus, ListingsPage},
    search::{self, assembler, pagination::PageParams},
};

/// list_favorites
///
/// [Authenticated Route] The caller's favorites, newest listing first. Unverified listings
/// are left out unless the caller may view all listings.
#[utoipa::path(
    get,
    path = "/api/favorites",
    params(PageParams),
    responses((status = 200, description = "Favorites", body = ListingsPage))
)]
pub async fn list_favorites(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<ListingsPage>, ApiError> {
    let verified_only = !user.can(Permission::ViewAllListings);
    let page = state
        .repo
        .favorite_listings(user.id, verified_only, params.request())
        .await?;
    Ok(Json(assembler::assemble_page(page)))
}

/// add_favorite
///
/// [Authenticated Route] Favoriting the same listing twice is a conflict, not a no-op.
///
/// The listing must be visible to the caller. A listing removed after that lookup makes
/// the insert fail its foreign key, which also ends as a 404.
#[utoipa::path(
    post,
    path = "/api/favorites",
    request_body = AddFavoriteRequest,
    responses(
        (status = 201, description = "Added", body = FavoriteAdded),
        (status = 404, description = "Listing not found", body = ErrorBody),
        (status = 409, description = "Already a favorite", body = ErrorBody)
    )
)]
pub async fn add_favorite(
    user: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<AddFavoriteRequest>,
) -> Result<(StatusCode, Json<FavoriteAdded>), ApiError> {
    // Callers who can see unverified listings may also favorite them.
    let listing =
        search::find_visible_listing(state.repo.as_ref(), payload.property_id, Some(&user), true)
            .await?;

    if !state.repo.add_favorite(user.id, listing.id).await? {
        return Err(ApiError::Conflict(
            "Property is already in favorites".to_string(),
        ));
    }
    Ok((
        StatusCode::CREATED,
        Json(FavoriteAdded {
            property_id: listing.id,
            property_title: listing.title,
        }),
    ))
}

/// remove_favorite
///
/// [Authenticated Route] 404 when the pair was never favorited.
#[utoipa::path(
    delete,
    path = "/api/favorites/{id}",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 204, description = "Removed"),
        (status = 404, description = "Not a favorite", body = ErrorBody)
    )
)]
pub async fn remove_favorite(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(listing_id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.repo.remove_favorite(user.id, listing_id).await? {
        return Err(ApiError::not_found("Favorite not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// check_favorite
///
/// [Authenticated Route]
#[utoipa::path(
    get,
    path = "/api/favorites/{id}/check",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses((status = 200, description = "Favorite status", body = FavoriteStatus))
)]
pub async fn check_favorite(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(listing_id): ApiPath<Uuid>,
) -> Result<Json<FavoriteStatus>, ApiError> {
    let is_favorite = state.repo.is_favorite(user.id, listing_id).await?;
    Ok(Json(FavoriteStatus {
        property_id: listing_id,
        is_favorite,
    }))
}
