use async_trait::async_trait;
use chrono::{DateTime, Duration, DurationRound, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Repository;
use crate::error::StoreError;
use crate::models::{
    Account, AccountChanges, CreateListingRequest, DashboardStats, Inquiry, InquiryFilter,
    InquiryStatus, ListingRecord, NewAccount, NewInquiry, Role, UpdateListingRequest,
};
use crate::search::assembler::{decode_string_list, encode_string_list};
use crate::search::pagination::{Page, PageRequest, paginate_slice};
use crate::search::predicate::ListingQuery;

#[derive(Default)]
struct State {
    accounts: HashMap<Uuid, Account>,
    listings: HashMap<Uuid, ListingRecord>,
    // (account, listing) -> favorited at
    favorites: HashMap<(Uuid, Uuid), DateTime<Utc>>,
    inquiries: HashMap<Uuid, Inquiry>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl State {
    /// Strictly increasing timestamps at Postgres (microsecond) precision, so newest-first
    /// ordering is deterministic even for inserts within the same microsecond.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let now = now
            .duration_trunc(Duration::microseconds(1))
            .unwrap_or(now);
        let next = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(next);
        next
    }

    /// Fills the owner columns the way the Postgres LEFT JOIN does.
    fn joined(&self, record: &ListingRecord) -> ListingRecord {
        let mut record = record.clone();
        let owner = record.owner_id.and_then(|id| self.accounts.get(&id));
        record.owner_username = owner.map(|o| o.username.clone());
        record.owner_first_name = owner.and_then(|o| o.first_name.clone());
        record.owner_last_name = owner.and_then(|o| o.last_name.clone());
        record
    }

    fn joined_inquiry(&self, inquiry: &Inquiry) -> Inquiry {
        let mut inquiry = inquiry.clone();
        inquiry.listing_title = inquiry
            .listing_id
            .and_then(|id| self.listings.get(&id))
            .map(|l| l.title.clone());
        inquiry
    }

    /// Newest first, `id` as tie-break.
    fn ordered_listings(
        &self,
        mut keep: impl FnMut(&ListingRecord) -> bool,
    ) -> Vec<ListingRecord> {
        let mut rows: Vec<ListingRecord> = self
            .listings
            .values()
            .map(|l| self.joined(l))
            .filter(|l| keep(l))
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        rows
    }

    fn check_account_unique(
        &self,
        id: Option<Uuid>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<(), StoreError> {
        for other in self.accounts.values().filter(|a| Some(a.id) != id) {
            if username.is_some_and(|u| u == other.username) {
                return Err(StoreError::Conflict("Username already exists".to_string()));
            }
            if email.is_some_and(|e| e == other.email) {
                return Err(StoreError::Conflict("Email already exists".to_string()));
            }
        }
        Ok(())
    }
}

/// MemoryRepository
///
/// An in-process `Repository` used by the test suite and for running the service without
/// Postgres. It evaluates the same `ListingQuery` predicates in memory and mirrors the
/// database's constraints: unique usernames/emails/favorite pairs, foreign keys that must
/// resolve, cascading favorites and nulled references on deletion. Each method holds the
/// lock for its whole mutation, so every write is atomic.
#[derive(Default)]
pub struct MemoryRepository {
    state: RwLock<State>,
    fail_all: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with a database error.
    pub fn set_simulate_failure(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Stores a listing row as-is, bypassing validation and encoding. Lets tests plant rows
    /// with arbitrary stored values.
    pub async fn insert_raw_listing(&self, record: ListingRecord) {
        let mut state = self.state.write().await;
        state.listings.insert(record.id, record);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::Protocol(
                "simulated store failure".to_string(),
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    // --- Accounts ---

    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;
        state.check_account_unique(None, Some(&account.username), Some(&account.email))?;

        let now = state.next_timestamp();
        let created = Account {
            id: Uuid::new_v4(),
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            first_name: account.first_name,
            last_name: account.last_name,
            role: account.role,
            is_main_admin: account.is_main_admin,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.accounts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        self.check()?;
        Ok(self.state.read().await.accounts.get(&id).cloned())
    }

    async fn find_account_by_login(&self, login: &str) -> Result<Option<Account>, StoreError> {
        self.check()?;
        let state = self.state.read().await;
        let by_username = state.accounts.values().find(|a| a.username == login);
        let found = by_username.or_else(|| state.accounts.values().find(|a| a.email == login));
        Ok(found.cloned())
    }

    async fn list_accounts(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Account>, StoreError> {
        self.check()?;
        let state = self.state.read().await;
        let needle = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let contains = |field: Option<&str>, needle: &str| -> bool {
            field.is_some_and(|f| f.to_lowercase().contains(needle))
        };
        let mut rows: Vec<Account> = state
            .accounts
            .values()
            .filter(|a| match &needle {
                None => true,
                Some(n) => {
                    contains(Some(a.username.as_str()), n)
                        || contains(Some(a.email.as_str()), n)
                        || contains(a.first_name.as_deref(), n)
                        || contains(a.last_name.as_deref(), n)
                }
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(paginate_slice(&rows, page))
    }

    async fn list_admins(&self) -> Result<Vec<Account>, StoreError> {
        self.check()?;
        let state = self.state.read().await;
        let mut admins: Vec<Account> = state
            .accounts
            .values()
            .filter(|a| a.role == Role::Admin)
            .cloned()
            .collect();
        admins.sort_by(|a, b| {
            b.is_main_admin
                .cmp(&a.is_main_admin)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(admins)
    }

    async fn update_account(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> Result<Option<Account>, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;
        if !state.accounts.contains_key(&id) {
            return Ok(None);
        }
        state.check_account_unique(
            Some(id),
            changes.username.as_deref(),
            changes.email.as_deref(),
        )?;

        let now = state.next_timestamp();
        let Some(account) = state.accounts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = changes.username {
            account.username = username;
        }
        if let Some(email) = changes.email {
            account.email = email;
        }
        if let Some(first_name) = changes.first_name {
            account.first_name = Some(first_name);
        }
        if let Some(last_name) = changes.last_name {
            account.last_name = Some(last_name);
        }
        if let Some(is_active) = changes.is_active {
            account.is_active = is_active;
        }
        if let Some(password_hash) = changes.password_hash {
            account.password_hash = password_hash;
        }
        account.updated_at = now;
        Ok(Some(account.clone()))
    }

    /// delete_account
    ///
    /// Mirrors the schema's `ON DELETE` rules:
    /// 1. The account's favorites go with it.
    /// 2. Listings it owned and inquiries it sent keep their rows with a `None` reference.
    async fn delete_account(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;
        let Some(account) = state.accounts.get(&id) else {
            return Ok(false);
        };
        if account.role == Role::Admin {
            let admins = state
                .accounts
                .values()
                .filter(|a| a.role == Role::Admin)
                .count();
            if admins <= 1 {
                return Err(StoreError::LastAdmin);
            }
        }

        state.accounts.remove(&id);
        state.favorites.retain(|(account_id, _), _| *account_id != id);
        for listing in state.listings.values_mut() {
            if listing.owner_id == Some(id) {
                listing.owner_id = None;
            }
        }
        for inquiry in state.inquiries.values_mut() {
            if inquiry.sender_id == Some(id) {
                inquiry.sender_id = None;
            }
        }
        Ok(true)
    }

    // --- Listings ---

    async fn search_listings(
        &self,
        query: &ListingQuery,
        page: PageRequest,
    ) -> Result<Page<ListingRecord>, StoreError> {
        self.check()?;
        let state = self.state.read().await;
        let rows = state.ordered_listings(|l| query.matches(l));
        Ok(paginate_slice(&rows, page))
    }

    async fn get_listing(&self, id: Uuid) -> Result<Option<ListingRecord>, StoreError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state.listings.get(&id).map(|l| state.joined(l)))
    }

    async fn create_listing(
        &self,
        owner_id: Uuid,
        listing: CreateListingRequest,
    ) -> Result<ListingRecord, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;
        if !state.accounts.contains_key(&owner_id) {
            return Err(StoreError::MissingReference(
                "Owner account not found".to_string(),
            ));
        }
        let now = state.next_timestamp();
        let record = ListingRecord {
            id: Uuid::new_v4(),
            title: listing.title,
            description: listing.description,
            property_type: listing.property_type,
            location: listing.location,
            address: listing.address,
            price: listing.price,
            bedrooms: listing.bedrooms,
            bathrooms: listing.bathrooms,
            square_feet: listing.square_feet,
            lot_size: listing.lot_size,
            year_built: listing.year_built,
            status: listing.status.unwrap_or_default(),
            features: Some(encode_string_list(&listing.features)),
            images: Some(encode_string_list(&listing.images)),
            owner_id: Some(owner_id),
            is_verified: false,
            verification_notes: None,
            created_at: now,
            updated_at: now,
            ..ListingRecord::default()
        };
        state.listings.insert(record.id, record.clone());
        Ok(state.joined(&record))
    }

    async fn update_listing(
        &self,
        id: Uuid,
        changes: UpdateListingRequest,
    ) -> Result<Option<ListingRecord>, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;
        let now = state.next_timestamp();
        let Some(listing) = state.listings.get_mut(&id) else {
            return Ok(None);
        };

        // Built on a copy and swapped in whole. An empty optional text clears the field.
        let mut updated = listing.clone();
        if let Some(v) = changes.title {
            updated.title = v;
        }
        if let Some(v) = changes.description {
            updated.description = Some(v).filter(|v| !v.is_empty());
        }
        if let Some(v) = changes.property_type {
            updated.property_type = v;
        }
        if let Some(v) = changes.location {
            updated.location = v;
        }
        if let Some(v) = changes.address {
            updated.address = Some(v).filter(|v| !v.is_empty());
        }
        if let Some(v) = changes.price {
            updated.price = v;
        }
        if let Some(v) = changes.bedrooms {
            updated.bedrooms = Some(v);
        }
        if let Some(v) = changes.bathrooms {
            updated.bathrooms = Some(v);
        }
        if let Some(v) = changes.square_feet {
            updated.square_feet = Some(v);
        }
        if let Some(v) = changes.lot_size {
            updated.lot_size = Some(v).filter(|v| !v.is_empty());
        }
        if let Some(v) = changes.year_built {
            updated.year_built = Some(v);
        }
        if let Some(v) = changes.status {
            updated.status = v;
        }
        if let Some(v) = changes.features {
            updated.features = Some(encode_string_list(&v));
        }
        if let Some(v) = changes.images {
            updated.images = Some(encode_string_list(&v));
        }
        updated.is_verified = changes.is_verified.unwrap_or(false);
        updated.updated_at = now;
        *listing = updated;

        Ok(state.listings.get(&id).map(|l| state.joined(l)))
    }

    async fn set_verification(
        &self,
        id: Uuid,
        is_verified: bool,
        notes: Option<String>,
    ) -> Result<Option<ListingRecord>, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;
        let now = state.next_timestamp();
        let Some(listing) = state.listings.get_mut(&id) else {
            return Ok(None);
        };
        listing.is_verified = is_verified;
        listing.verification_notes = notes;
        listing.updated_at = now;
        Ok(state.listings.get(&id).map(|l| state.joined(l)))
    }

    async fn append_images(
        &self,
        id: Uuid,
        images: Vec<String>,
    ) -> Result<Option<ListingRecord>, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;
        let now = state.next_timestamp();
        let Some(listing) = state.listings.get_mut(&id) else {
            return Ok(None);
        };
        let mut merged = decode_string_list(listing.images.as_deref(), "images", id);
        merged.extend(images);
        listing.images = Some(encode_string_list(&merged));
        listing.is_verified = false;
        listing.updated_at = now;
        Ok(state.listings.get(&id).map(|l| state.joined(l)))
    }

    async fn delete_listing(&self, id: Uuid) -> Result<Option<ListingRecord>, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;
        let Some(existing) = state.listings.get(&id).map(|l| state.joined(l)) else {
            return Ok(None);
        };
        state.listings.remove(&id);
        state.favorites.retain(|(_, listing_id), _| *listing_id != id);
        for inquiry in state.inquiries.values_mut() {
            if inquiry.listing_id == Some(id) {
                inquiry.listing_id = None;
            }
        }
        Ok(Some(existing))
    }

    // --- Favorites ---

    /// Same error order as the Postgres foreign keys: the listing is checked first.
    async fn add_favorite(&self, account_id: Uuid, listing_id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;
        if state.favorites.contains_key(&(account_id, listing_id)) {
            return Ok(false);
        }
        if !state.listings.contains_key(&listing_id) {
            return Err(StoreError::MissingReference("Property not found".to_string()));
        }
        if !state.accounts.contains_key(&account_id) {
            return Err(StoreError::MissingReference("Account not found".to_string()));
        }
        let now = state.next_timestamp();
        state.favorites.insert((account_id, listing_id), now);
        Ok(true)
    }

    async fn remove_favorite(
        &self,
        account_id: Uuid,
        listing_id: Uuid,
    ) -> Result<bool, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;
        Ok(state.favorites.remove(&(account_id, listing_id)).is_some())
    }

    async fn is_favorite(&self, account_id: Uuid, listing_id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state.favorites.contains_key(&(account_id, listing_id)))
    }

    async fn favorite_listings(
        &self,
        account_id: Uuid,
        verified_only: bool,
        page: PageRequest,
    ) -> Result<Page<ListingRecord>, StoreError> {
        self.check()?;
        let state = self.state.read().await;
        let rows = state.ordered_listings(|l| {
            state.favorites.contains_key(&(account_id, l.id)) && (!verified_only || l.is_verified)
        });
        Ok(paginate_slice(&rows, page))
    }

    // --- Inquiries ---

    async fn create_inquiry(&self, inquiry: NewInquiry) -> Result<Inquiry, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;
        if inquiry.listing_id.is_some_and(|id| !state.listings.contains_key(&id)) {
            return Err(StoreError::MissingReference("Property not found".to_string()));
        }
        if inquiry.sender_id.is_some_and(|id| !state.accounts.contains_key(&id)) {
            return Err(StoreError::MissingReference("Account not found".to_string()));
        }
        let created_at = state.next_timestamp();
        let created = Inquiry {
            id: Uuid::new_v4(),
            name: inquiry.name,
            email: inquiry.email,
            phone: inquiry.phone,
            subject: inquiry.subject,
            message: inquiry.message,
            listing_id: inquiry.listing_id,
            listing_title: None,
            sender_id: inquiry.sender_id,
            status: InquiryStatus::Unread,
            created_at,
        };
        state.inquiries.insert(created.id, created.clone());
        Ok(state.joined_inquiry(&created))
    }

    async fn get_inquiry(&self, id: Uuid) -> Result<Option<Inquiry>, StoreError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state.inquiries.get(&id).map(|i| state.joined_inquiry(i)))
    }

    async fn list_inquiries(
        &self,
        filter: &InquiryFilter,
        page: PageRequest,
    ) -> Result<Page<Inquiry>, StoreError> {
        self.check()?;
        let state = self.state.read().await;
        let mut rows: Vec<Inquiry> = state
            .inquiries
            .values()
            .filter(|i| filter.matches(i))
            .map(|i| state.joined_inquiry(i))
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(paginate_slice(&rows, page))
    }

    async fn set_inquiry_status(
        &self,
        id: Uuid,
        status: InquiryStatus,
    ) -> Result<Option<Inquiry>, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;
        let Some(inquiry) = state.inquiries.get_mut(&id) else {
            return Ok(None);
        };
        inquiry.status = status;
        Ok(state.inquiries.get(&id).map(|i| state.joined_inquiry(i)))
    }

    async fn delete_inquiry(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;
        Ok(state.inquiries.remove(&id).is_some())
    }

    // --- Dashboard ---

    async fn get_stats(&self) -> Result<DashboardStats, StoreError> {
        self.check()?;
        let state = self.state.read().await;
        let verified = state.listings.values().filter(|l| l.is_verified).count() as i64;
        let total = state.listings.len() as i64;
        Ok(DashboardStats {
            total_listings: total,
            verified_listings: verified,
            pending_verification: total - verified,
            total_accounts: state.accounts.len() as i64,
            total_favorites: state.favorites.len() as i64,
            unread_inquiries: state
                .inquiries
                .values()
                .filter(|i| i.status == InquiryStatus::Unread)
                .count() as i64,
        })
    }
}
