use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    routing::get,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod search;
pub mod storage;

// Routers grouped by caller (public, authenticated, admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use credentials::CredentialService;
pub use error::{ApiError, StoreError};
pub use repository::{MemoryRepository, PostgresRepository, Repository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document for every route, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::accounts::register, handlers::accounts::login, handlers::accounts::refresh,
        handlers::accounts::me, handlers::accounts::change_password, handlers::accounts::logout,
        handlers::accounts::list_admins, handlers::accounts::create_admin,
        handlers::accounts::delete_admin,
        handlers::users::list_users, handlers::users::search_users, handlers::users::get_user,
        handlers::users::update_user, handlers::users::delete_user,
        handlers::listings::list_listings, handlers::listings::search_listings,
        handlers::listings::get_listing, handlers::listings::my_listings,
        handlers::listings::create_listing, handlers::listings::update_listing,
        handlers::listings::delete_listing, handlers::listings::verify_listing,
        handlers::listings::add_images,
        handlers::favorites::list_favorites, handlers::favorites::add_favorite,
        handlers::favorites::remove_favorite, handlers::favorites::check_favorite,
        handlers::inquiries::create_inquiry, handlers::inquiries::list_inquiries,
        handlers::inquiries::my_inquiries, handlers::inquiries::get_inquiry,
        handlers::inquiries::update_inquiry_status, handlers::inquiries::delete_inquiry,
        handlers::uploads::upload_file, handlers::uploads::upload_multiple,
        handlers::admin::get_stats
    ),
    components(
        schemas(
            models::Role, models::ListingStatus, models::PropertyType, models::InquiryStatus,
            models::AccountProfile, models::RegisterRequest, models::LoginRequest,
            models::LoginResponse, models::RefreshRequest, models::AccessTokenResponse,
            models::ChangePasswordRequest, models::UpdateAccountRequest, models::AccountsPage,
            models::OwnerSummary, models::ListingResponse, models::ListingsPage,
            models::ListingSearchResponse, models::CreateListingRequest,
            models::UpdateListingRequest, models::VerifyListingRequest, models::AddImagesRequest,
            models::AddFavoriteRequest, models::FavoriteAdded, models::FavoriteStatus,
            models::Inquiry, models::CreateInquiryRequest, models::UpdateInquiryStatusRequest,
            models::InquiriesPage, models::UploadedFile, models::UploadedFiles,
            models::DashboardStats, models::MessageResponse,
            search::pagination::PageMeta, search::predicate::ListingFilters, error::ErrorBody,
        )
    ),
    tags(
        (name = "realty-portal", description = "Real estate listings API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Shared by every request. Handlers pull individual services out of it through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub storage: StorageState,
    pub config: AppConfig,
    /// Password hashing and token signing, keyed from `config.jwt_secret`.
    pub credentials: CredentialService,
}

impl AppState {
    pub fn new(repo: RepositoryState, storage: StorageState, config: AppConfig) -> Self {
        let credentials = CredentialService::new(&config);
        Self {
            repo,
            storage,
            config,
            credentials,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for CredentialService {
    fn from_ref(app_state: &AppState) -> CredentialService {
        app_state.credentials.clone()
    }
}

/// create_router
///
/// `/health`, the Swagger UI, and every API route under `/api`, wrapped in the request-id,
/// tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");
    let upload_body_limit = state.config.upload.request_body_limit();

    let api = public::public_routes()
        .merge(authenticated::authenticated_routes())
        .merge(admin::admin_routes(upload_body_limit));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // GET /health
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one request, tagged with its `x-request-id` so every log line of the request
/// can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
