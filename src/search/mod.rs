//! Listing search: filters become a predicate conjunction, the visibility policy narrows it,
//! the repository executes it in a bounded window and the assembler shapes the response.

pub mod assembler;
pub mod pagination;
pub mod predicate;
pub mod visibility;

use crate::{
    auth::AuthUser,
    error::ApiError,
    models::{ListingRecord, ListingsPage},
    repository::Repository,
};
use predicate::ListingFilters;
use uuid::Uuid;

/// search_listings
///
/// The list/search flow shared by `GET /api/properties` and `GET /api/properties/search`:
/// 1. `to_query` validates the filters and turns them into predicates.
/// 2. The visibility policy adds `Verified` unless the caller may and did ask for all.
/// 3. The repository runs the query for one page.
/// 4. Rows are assembled into their public shape.
///
/// Any validation failure is returned before the repository is called.
pub async fn search_listings(
    repo: &dyn Repository,
    filters: &ListingFilters,
    caller: Option<&AuthUser>,
) -> Result<ListingsPage, ApiError> {
    let query = filters.to_query()?;
    let query = visibility::apply(query, caller, filters.show_all());
    let page = repo.search_listings(&query, filters.page_request()).await?;
    Ok(assembler::assemble_page(page))
}

/// find_visible_listing
///
/// Fetches one listing under the same visibility rule. A hidden listing is indistinguishable
/// from a missing one.
pub async fn find_visible_listing(
    repo: &dyn Repository,
    id: Uuid,
    caller: Option<&AuthUser>,
    show_all: bool,
) -> Result<ListingRecord, ApiError> {
    match repo.get_listing(id).await? {
        Some(record) if visibility::is_visible(&record, caller, show_all) => Ok(record),
        _ => Err(ApiError::not_found("Property not found")),
    }
}
