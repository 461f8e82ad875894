use crate::{
    AppState,
    handlers::{accounts, admin, inquiries, listings, uploads, users},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};

/// Admin Router Module
///
/// Every handler here calls `authorize` with the permission it needs, so a signed-in
/// client gets 403 and an anonymous caller gets 401.
///
/// `upload_body_limit` replaces axum's 2 MiB default on the upload routes only.
pub fn admin_routes(upload_body_limit: usize) -> Router<AppState> {
    Router::new()
        // --- Admin accounts (main admin only) ---
        .route(
            "/auth/admins",
            get(accounts::list_admins).post(accounts::create_admin),
        )
        .route("/auth/admins/{id}", delete(accounts::delete_admin))
        // --- Accounts ---
        .route("/users", get(users::list_users))
        .route("/users/search", get(users::search_users))
        .route("/users/{id}", delete(users::delete_user))
        // --- Listing management ---
        .route("/properties", post(listings::create_listing))
        .route(
            "/properties/{id}",
            put(listings::update_listing).delete(listings::delete_listing),
        )
        .route("/properties/{id}/verify", put(listings::verify_listing))
        .route("/properties/{id}/images", post(listings::add_images))
        // --- Inquiry moderation ---
        .route("/contact", get(inquiries::list_inquiries))
        .route(
            "/contact/{id}",
            get(inquiries::get_inquiry).delete(inquiries::delete_inquiry),
        )
        .route("/contact/{id}/status", put(inquiries::update_inquiry_status))
        // --- Image uploads ---
        .route(
            "/upload",
            post(uploads::upload_file).layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route(
            "/upload/multiple",
            post(uploads::upload_multiple).layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        // GET /admin/stats
        .route("/admin/stats", get(admin::get_stats))
}
