use crate::{
    AppState,
    handlers::{accounts, favorites, inquiries, listings, users},
};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Authenticated Router Module
///
/// Routes open to any active account. Handlers receive a resolved `AuthUser`; the few that
/// act on another account (`/users/{id}`) check ownership or permissions themselves.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // --- Session ---
        .route("/auth/me", get(accounts::me))
        .route("/auth/change-password", post(accounts::change_password))
        .route("/auth/logout", post(accounts::logout))
        // GET/PUT /users/{id}
        // Self, or admins holding ViewAccounts / ManageAccounts. DELETE is merged in from
        // the admin router.
        .route(
            "/users/{id}",
            get(users::get_user).put(users::update_user),
        )
        // GET /me/properties
        // Every listing owned by the caller, including unverified and sold ones.
        .route("/me/properties", get(listings::my_listings))
        // --- Favorites ---
        .route(
            "/favorites",
            get(favorites::list_favorites).post(favorites::add_favorite),
        )
        .route("/favorites/{id}", delete(favorites::remove_favorite))
        .route("/favorites/{id}/check", get(favorites::check_favorite))
        // --- Inquiries ---
        .route("/contact/my-messages", get(inquiries::my_inquiries))
}
