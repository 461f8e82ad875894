use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    Account, AccountChanges, CreateListingRequest, DashboardStats, Inquiry, InquiryFilter,
    InquiryStatus, ListingRecord, NewAccount, NewInquiry, UpdateListingRequest,
};
use crate::search::pagination::{Page, PageRequest};
use crate::search::predicate::ListingQuery;

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// Repository
///
/// The persistence contract. Handlers and the search flow only see this trait, so the
/// Postgres implementation and the in-memory one are interchangeable.
///
/// Every mutation is atomic: it either applies completely or not at all. Paginated reads
/// order newest first with `id` as the tie-break.
///
/// Errors:
/// - `StoreError::Conflict` for uniqueness violations (username, email, favorite pair).
/// - `StoreError::MissingReference` when a write names an account or listing that does not
///   exist. Handlers surface it as 404.
/// - `StoreError::Database` for everything else.
///
/// **Send + Sync** lets `Arc<dyn Repository>` cross Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    /// Inserts a new account. `is_active` starts true.
    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError>;
    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, StoreError>;
    /// Looks an account up by username or, failing that, by email.
    async fn find_account_by_login(&self, login: &str) -> Result<Option<Account>, StoreError>;
    /// Accounts whose username, email or names contain `search` (case-insensitive).
    async fn list_accounts(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Account>, StoreError>;
    /// All admin accounts, main admin first, then oldest first.
    async fn list_admins(&self) -> Result<Vec<Account>, StoreError>;
    /// Applies the `Some` fields of `changes`. `None` when the account does not exist.
    async fn update_account(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> Result<Option<Account>, StoreError>;
    /// Removes an account. Fails with `StoreError::LastAdmin` if it is the only admin left.
    async fn delete_account(&self, id: Uuid) -> Result<bool, StoreError>;

    // --- Listings ---
    /// search_listings
    ///
    /// Runs a `ListingQuery` (a conjunction of predicates) and returns one page plus the
    /// total match count.
    /// *Note*: visibility is already part of `query`; this method applies no policy of its own.
    async fn search_listings(
        &self,
        query: &ListingQuery,
        page: PageRequest,
    ) -> Result<Page<ListingRecord>, StoreError>;
    /// Any listing by ID, verified or not. Callers decide visibility.
    async fn get_listing(&self, id: Uuid) -> Result<Option<ListingRecord>, StoreError>;
    /// New listings start unverified. An unknown `owner_id` is a `MissingReference`.
    async fn create_listing(
        &self,
        owner_id: Uuid,
        listing: CreateListingRequest,
    ) -> Result<ListingRecord, StoreError>;
    /// Partial update. `is_verified` becomes the payload's value, or false when absent.
    /// An empty `description`, `address` or `lot_size` clears that column.
    async fn update_listing(
        &self,
        id: Uuid,
        changes: UpdateListingRequest,
    ) -> Result<Option<ListingRecord>, StoreError>;
    /// Sets the verification flag and notes, leaving content untouched.
    async fn set_verification(
        &self,
        id: Uuid,
        is_verified: bool,
        notes: Option<String>,
    ) -> Result<Option<ListingRecord>, StoreError>;
    /// Appends image references and marks the listing unverified.
    async fn append_images(
        &self,
        id: Uuid,
        images: Vec<String>,
    ) -> Result<Option<ListingRecord>, StoreError>;
    /// Deletes a listing and its favorites; inquiries keep a null reference. Returns the
    /// deleted row.
    async fn delete_listing(&self, id: Uuid) -> Result<Option<ListingRecord>, StoreError>;

    // --- Favorites ---
    /// Returns `false` when the pair already exists. A missing account or listing is a
    /// `MissingReference`, even if it was deleted after the caller looked it up.
    async fn add_favorite(&self, account_id: Uuid, listing_id: Uuid) -> Result<bool, StoreError>;
    /// Returns `false` when the pair did not exist.
    async fn remove_favorite(&self, account_id: Uuid, listing_id: Uuid)
    -> Result<bool, StoreError>;
    async fn is_favorite(&self, account_id: Uuid, listing_id: Uuid) -> Result<bool, StoreError>;
    /// The listings `account_id` has favorited, in the usual newest-listing-first order.
    async fn favorite_listings(
        &self,
        account_id: Uuid,
        verified_only: bool,
        page: PageRequest,
    ) -> Result<Page<ListingRecord>, StoreError>;

    // --- Inquiries ---
    /// Stored as `Unread`. Both references are optional, but must exist when given.
    async fn create_inquiry(&self, inquiry: NewInquiry) -> Result<Inquiry, StoreError>;
    async fn get_inquiry(&self, id: Uuid) -> Result<Option<Inquiry>, StoreError>;
    /// Filters by status, listing and sender; all conditions must hold.
    async fn list_inquiries(
        &self,
        filter: &InquiryFilter,
        page: PageRequest,
    ) -> Result<Page<Inquiry>, StoreError>;
    async fn set_inquiry_status(
        &self,
        id: Uuid,
        status: InquiryStatus,
    ) -> Result<Option<Inquiry>, StoreError>;
    async fn delete_inquiry(&self, id: Uuid) -> Result<bool, StoreError>;

    // --- Dashboard ---
    /// Row counts for the admin dashboard, read in one round trip.
    async fn get_stats(&self) -> Result<DashboardStats, StoreError>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer held by `AppState`.
pub type RepositoryState = Arc<dyn Repository>;
