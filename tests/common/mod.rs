#![allow(dead_code)]

use realty_portal::{
    AppConfig, AppState, MemoryRepository, MockStorageService,
    auth::AuthUser,
    models::{Account, CreateListingRequest, ListingRecord, NewAccount, PropertyType, Role},
    repository::{Repository, RepositoryState},
    storage::StorageState,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

pub const PASSWORD: &str = "password123";

/// Application state over an in-memory repository and mock storage. The returned handles
/// share the state's backing stores.
pub struct TestContext {
    pub state: AppState,
    pub repo: Arc<MemoryRepository>,
    pub storage: MockStorageService,
}

pub fn test_context() -> TestContext {
    test_context_with(MockStorageService::new())
}

pub fn test_context_with(storage: MockStorageService) -> TestContext {
    let repo = Arc::new(MemoryRepository::new());
    let state = AppState::new(
        repo.clone() as RepositoryState,
        Arc::new(storage.clone()) as StorageState,
        AppConfig::default(),
    );
    TestContext {
        state,
        repo,
        storage,
    }
}

impl TestContext {
    pub async fn account(&self, username: &str, role: Role, is_main_admin: bool) -> Account {
        let password_hash = self
            .state
            .credentials
            .hash_password(PASSWORD)
            .await
            .expect("hashing should succeed");
        self.repo
            .create_account(NewAccount {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password_hash,
                first_name: None,
                last_name: None,
                role,
                is_main_admin,
            })
            .await
            .expect("account should be created")
    }

    pub async fn client(&self, username: &str) -> AuthUser {
        AuthUser::from(&self.account(username, Role::Client, false).await)
    }

    pub async fn admin(&self, username: &str) -> AuthUser {
        AuthUser::from(&self.account(username, Role::Admin, false).await)
    }

    pub async fn main_admin(&self, username: &str) -> AuthUser {
        AuthUser::from(&self.account(username, Role::Admin, true).await)
    }

    pub fn bearer(&self, user: &AuthUser) -> String {
        let token = self
            .state
            .credentials
            .issue_access(user.id)
            .expect("token should be issued");
        format!("Bearer {token}")
    }

    /// Creates a listing and optionally verifies it. With no owner the listing is created by
    /// a throwaway account that is deleted straight after, leaving it unowned.
    pub async fn listing(
        &self,
        owner: Option<Uuid>,
        request: CreateListingRequest,
        verified: bool,
    ) -> ListingRecord {
        let owner_id = match owner {
            Some(id) => id,
            None => self.throwaway_account().await,
        };
        let created = self
            .repo
            .create_listing(owner_id, request)
            .await
            .expect("listing should be created");
        if owner.is_none() {
            self.repo
                .delete_account(owner_id)
                .await
                .expect("throwaway account should be deleted");
        }
        if verified {
            self.repo
                .set_verification(created.id, true, None)
                .await
                .expect("verification should succeed");
        }
        self.repo
            .get_listing(created.id)
            .await
            .expect("lookup should succeed")
            .expect("listing exists")
    }

    async fn throwaway_account(&self) -> Uuid {
        let username = format!("lister_{}", Uuid::new_v4().simple());
        self.repo
            .create_account(NewAccount {
                email: format!("{username}@example.com"),
                username,
                password_hash: "unused".to_string(),
                first_name: None,
                last_name: None,
                role: Role::Client,
                is_main_admin: false,
            })
            .await
            .expect("account should be created")
            .id
    }
}

pub fn listing_request(
    title: &str,
    location: &str,
    price: i64,
    bedrooms: Option<i32>,
    property_type: PropertyType,
) -> CreateListingRequest {
    CreateListingRequest {
        title: title.to_string(),
        location: location.to_string(),
        price: Decimal::from(price),
        bedrooms,
        property_type,
        ..CreateListingRequest::default()
    }
}
