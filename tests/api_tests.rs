mod common;

use common::{PASSWORD, TestContext, test_context};
use realty_portal::{
    create_router,
    error::ErrorBody,
    models::{
        AccessTokenResponse, AccountProfile, FavoriteStatus, InquiriesPage, Inquiry,
        ListingResponse, ListingSearchResponse, ListingsPage, LoginResponse,
    },
};
use reqwest::StatusCode;
use serde_json::json;
use tokio::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub ctx: TestContext,
    pub client: reqwest::Client,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn login(&self, username: &str, password: &str) -> LoginResponse {
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("req fail");
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.expect("login body")
    }
}

async fn spawn_app() -> TestApp {
    let ctx = test_context();
    let router = create_router(ctx.state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        ctx,
        client: reqwest::Client::new(),
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app.client.get(app.url("/health")).send().await.expect("req fail");
    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(app.url("/api-docs/openapi.json"))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::OK);
    let doc: serde_json::Value = response.json().await.unwrap();
    assert!(doc["paths"]["/api/properties/search"].is_object());
}

#[tokio::test]
async fn test_account_session_flow() {
    let app = spawn_app().await;

    // Register
    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({
            "username": "dana",
            "email": "dana@example.com",
            "password": "hunter22",
            "first_name": "Dana"
        }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::CREATED);
    let profile: AccountProfile = response.json().await.unwrap();
    assert_eq!(profile.username, "dana");

    // Same username again
    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({
            "username": "dana",
            "email": "other@example.com",
            "password": "hunter22"
        }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Login, refresh, me
    let session = app.login("dana@example.com", "hunter22").await;
    assert_eq!(session.user.id, profile.id);

    let response = app
        .client
        .post(app.url("/api/auth/refresh"))
        .json(&json!({ "refresh_token": session.refresh_token }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::OK);
    let refreshed: AccessTokenResponse = response.json().await.unwrap();

    let response = app
        .client
        .get(app.url("/api/auth/me"))
        .bearer_auth(&refreshed.access_token)
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::OK);
    let me: AccountProfile = response.json().await.unwrap();
    assert_eq!(me.id, profile.id);

    // An access token is not a refresh token.
    let response = app
        .client
        .post(app.url("/api/auth/refresh"))
        .json(&json!({ "refresh_token": session.access_token }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Change password, then the old one stops working.
    let response = app
        .client
        .post(app.url("/api/auth/change-password"))
        .bearer_auth(&session.access_token)
        .json(&json!({ "current_password": "hunter22", "new_password": "hunter33" }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "username": "dana", "password": "hunter22" }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let error: ErrorBody = response.json().await.unwrap();
    assert_eq!(error.status_code, 401);

    app.login("dana", "hunter33").await;
}

#[tokio::test]
async fn test_listing_lifecycle() {
    let app = spawn_app().await;
    app.ctx.admin("adam").await;
    let admin = app.login("adam", PASSWORD).await;

    // Admin creates a listing; it starts unverified.
    let response = app
        .client
        .post(app.url("/api/properties"))
        .bearer_auth(&admin.access_token)
        .json(&json!({
            "title": "Harbour View",
            "property_type": "apartment",
            "location": "Cobh, Cork",
            "price": "310000",
            "bedrooms": 2,
            "features": ["sea view"]
        }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: ListingResponse = response.json().await.unwrap();
    assert!(!created.is_verified);
    assert_eq!(created.price.to_string(), "310000.00");
    assert_eq!(created.owner.as_ref().map(|o| o.id), Some(admin.user.id));

    // Not publicly visible yet.
    let response = app
        .client
        .get(app.url(&format!("/api/properties/{}", created.id)))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let page: ListingsPage = app
        .client
        .get(app.url("/api/properties"))
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 0);

    // ...but the admin can see it with show_all.
    let page: ListingsPage = app
        .client
        .get(app.url("/api/properties?show_all=true"))
        .bearer_auth(&admin.access_token)
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 1);

    // Verify
    let response = app
        .client
        .put(app.url(&format!("/api/properties/{}/verify", created.id)))
        .bearer_auth(&admin.access_token)
        .json(&json!({ "is_verified": true, "verification_notes": "Visited" }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::OK);

    // Public search finds it.
    let response = app
        .client
        .get(app.url("/api/properties/search?location=cork&category=apartment&min_rooms=2"))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::OK);
    let results: ListingSearchResponse = response.json().await.unwrap();
    assert_eq!(results.pagination.total, 1);
    assert_eq!(results.properties[0].id, created.id);
    assert_eq!(results.properties[0].features, vec!["sea view"]);

    let response = app
        .client
        .get(app.url("/api/properties/search?location=dublin"))
        .send()
        .await
        .expect("req fail");
    let results: ListingSearchResponse = response.json().await.unwrap();
    assert!(results.properties.is_empty());

    // Delete
    let response = app
        .client
        .delete(app.url(&format!("/api/properties/{}", created.id)))
        .bearer_auth(&admin.access_token)
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .client
        .get(app.url(&format!("/api/properties/{}", created.id)))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_favorites_and_contact_flow() {
    let app = spawn_app().await;
    let owner = app.ctx.admin("adam").await;
    let listing = app
        .ctx
        .listing(
            Some(owner.id),
            common::listing_request(
                "Farmhouse",
                "Kinsale",
                450_000,
                Some(4),
                realty_portal::models::PropertyType::House,
            ),
            true,
        )
        .await;
    app.ctx.client("carol").await;
    let carol = app.login("carol", PASSWORD).await;

    // Favorite it twice: the second is a conflict.
    for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
        let response = app
            .client
            .post(app.url("/api/favorites"))
            .bearer_auth(&carol.access_token)
            .json(&json!({ "property_id": listing.id }))
            .send()
            .await
            .expect("req fail");
        assert_eq!(response.status(), expected);
    }

    let status: FavoriteStatus = app
        .client
        .get(app.url(&format!("/api/favorites/{}/check", listing.id)))
        .bearer_auth(&carol.access_token)
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert!(status.is_favorite);

    let favorites: ListingsPage = app
        .client
        .get(app.url("/api/favorites"))
        .bearer_auth(&carol.access_token)
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert_eq!(favorites.properties.len(), 1);

    // Contact as a signed-in client: the sender is recorded.
    let response = app
        .client
        .post(app.url("/api/contact"))
        .bearer_auth(&carol.access_token)
        .json(&json!({
            "name": "Carol",
            "email": "carol@example.com",
            "message": "Can I view it on Saturday?",
            "property_id": listing.id
        }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::CREATED);
    let inquiry: Inquiry = response.json().await.unwrap();
    assert_eq!(inquiry.sender_id, Some(carol.user.id));
    assert_eq!(inquiry.listing_title.as_deref(), Some("Farmhouse"));

    // Anonymous contact works too.
    let response = app
        .client
        .post(app.url("/api/contact"))
        .json(&json!({
            "name": "Guest",
            "email": "guest@example.com",
            "message": "Price negotiable?"
        }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::CREATED);

    let mine: InquiriesPage = app
        .client
        .get(app.url("/api/contact/my-messages"))
        .bearer_auth(&carol.access_token)
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert_eq!(mine.messages.len(), 1);

    // Clients cannot read the inbox; admins see both messages.
    let response = app
        .client
        .get(app.url("/api/contact"))
        .bearer_auth(&carol.access_token)
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = app.login("adam", PASSWORD).await;
    let inbox: InquiriesPage = app
        .client
        .get(app.url("/api/contact"))
        .bearer_auth(&admin.access_token)
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert_eq!(inbox.pagination.total, 2);

    // Remove the favorite.
    let response = app
        .client
        .delete(app.url(&format!("/api/favorites/{}", listing.id)))
        .bearer_auth(&carol.access_token)
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
