use crate::{
    AppState,
    handlers::{accounts, inquiries, listings},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Registration, login and token refresh, plus read access to listings. Listing reads
/// only ever return verified listings to anonymous callers.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // --- Authentication ---
        .route("/auth/register", post(accounts::register))
        .route("/auth/login", post(accounts::login))
        .route("/auth/refresh", post(accounts::refresh))
        // --- Listings ---
        // GET /properties?location=&property_type=&min_price=&max_price=&bedrooms=&status=
        .route("/properties", get(listings::list_listings))
        .route("/properties/search", get(listings::search_listings))
        .route("/properties/{id}", get(listings::get_listing))
        // POST /contact
        // Inquiry form. A valid bearer token attaches the sender's account.
        .route("/contact", post(inquiries::create_inquiry))
}
