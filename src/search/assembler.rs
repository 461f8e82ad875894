use uuid::Uuid;

use crate::models::{ListingRecord, ListingResponse, ListingsPage, OwnerSummary, display_name};
use crate::search::pagination::Page;

/// Encodes a tag or image list into its stored JSON form.
pub fn encode_string_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// decode_string_list
///
/// Lossy decoding of a stored JSON list. A missing value or a corrupt encoding yields an
/// empty list; corruption is logged, never returned to the caller.
pub fn decode_string_list(raw: Option<&str>, field: &str, listing_id: Uuid) -> Vec<String> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(%listing_id, field, "corrupt stored list, serving empty: {}", e);
            Vec::new()
        }
    }
}

fn owner_summary(record: &ListingRecord) -> Option<OwnerSummary> {
    let id = record.owner_id?;
    let username = record.owner_username.clone()?;
    let name = display_name(
        &username,
        record.owner_first_name.as_deref(),
        record.owner_last_name.as_deref(),
    );
    Some(OwnerSummary { id, username, name })
}

/// Maps a stored listing row to its public representation.
pub fn assemble(record: ListingRecord) -> ListingResponse {
    let features = decode_string_list(record.features.as_deref(), "features", record.id);
    let images = decode_string_list(record.images.as_deref(), "images", record.id);
    let owner = owner_summary(&record);

    ListingResponse {
        id: record.id,
        title: record.title,
        description: record.description,
        property_type: record.property_type,
        location: record.location,
        address: record.address,
        price: record.price,
        bedrooms: record.bedrooms,
        bathrooms: record.bathrooms,
        square_feet: record.square_feet,
        lot_size: record.lot_size,
        year_built: record.year_built,
        status: record.status,
        features,
        images,
        owner,
        is_verified: record.is_verified,
        verification_notes: record.verification_notes,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

pub fn assemble_page(page: Page<ListingRecord>) -> ListingsPage {
    let page = page.map(assemble);
    ListingsPage {
        properties: page.items,
        pagination: page.meta,
    }
}
