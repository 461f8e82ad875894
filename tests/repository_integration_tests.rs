//! Runs against a live Postgres. `DATABASE_URL` must point at a scratch database:
//! `cargo test --test repository_integration_tests -- --ignored`.

use realty_portal::{
    StoreError,
    models::{
        AccountChanges, CreateListingRequest, InquiryFilter, InquiryStatus, NewAccount,
        NewInquiry, PropertyType, Role, UpdateListingRequest,
    },
    repository::{PostgresRepository, Repository},
    search::{
        pagination::PageRequest,
        predicate::{ListingQuery, Predicate},
    },
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
    /// Unique per test run so parallel tests never see each other's rows.
    tag: String,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext {
            pool,
            tag: Uuid::new_v4().simple().to_string()[..10].to_string(),
        }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }

    fn new_account(&self, name: &str, role: Role) -> NewAccount {
        NewAccount {
            username: format!("{name}_{}", self.tag),
            email: format!("{name}_{}@example.com", self.tag),
            password_hash: "$2b$04$unused".to_string(),
            first_name: Some(name.to_string()),
            last_name: None,
            role,
            is_main_admin: false,
        }
    }

    fn listing(&self, title: &str, price: i64, bedrooms: i32) -> CreateListingRequest {
        CreateListingRequest {
            title: title.to_string(),
            location: format!("Town {}", self.tag),
            price: Decimal::from(price),
            bedrooms: Some(bedrooms),
            property_type: PropertyType::House,
            features: vec!["garden".to_string()],
            ..CreateListingRequest::default()
        }
    }

    fn in_town(&self) -> ListingQuery {
        ListingQuery::new().and(Predicate::LocationContains(format!("town {}", self.tag)))
    }
}

// --- Accounts ---

#[tokio::test]
#[ignore]
async fn test_account_uniqueness_and_lookup() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let created = repo
        .create_account(ctx.new_account("erin", Role::Client))
        .await
        .expect("account should be created");
    assert!(created.is_active);

    let duplicate = repo.create_account(ctx.new_account("erin", Role::Client)).await;
    assert!(matches!(duplicate, Err(StoreError::Conflict(m)) if m == "Username already exists"));

    let by_email = repo
        .find_account_by_login(&created.email)
        .await
        .unwrap()
        .expect("found by email");
    assert_eq!(by_email.id, created.id);

    let updated = repo
        .update_account(
            created.id,
            AccountChanges {
                last_name: Some("Smith".to_string()),
                is_active: Some(false),
                ..AccountChanges::default()
            },
        )
        .await
        .unwrap()
        .expect("account exists");
    assert_eq!(updated.last_name.as_deref(), Some("Smith"));
    assert!(!updated.is_active);

    let found = repo
        .list_accounts(Some(&ctx.tag), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(found.meta.total, 1);

    assert!(repo.delete_account(created.id).await.unwrap());
    assert!(!repo.delete_account(created.id).await.unwrap());
}

// --- Listings ---

#[tokio::test]
#[ignore]
async fn test_listing_search_and_pagination() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = repo
        .create_account(ctx.new_account("olive", Role::Admin))
        .await
        .unwrap();

    for (title, price, bedrooms) in [("Small", 100_000, 1), ("Medium", 200_000, 3), ("Large", 300_000, 5)] {
        let created = repo
            .create_listing(owner.id, ctx.listing(title, price, bedrooms))
            .await
            .unwrap();
        assert!(!created.is_verified);
        assert_eq!(created.owner_username.as_deref(), Some(owner.username.as_str()));
    }

    let all = repo
        .search_listings(&ctx.in_town(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(all.meta.total, 3);
    // Newest first.
    assert_eq!(all.items[0].title, "Large");

    let query = ctx
        .in_town()
        .and(Predicate::PriceAtLeast(Decimal::from(150_000)))
        .and(Predicate::BedroomsAtLeast(4));
    let filtered = repo.search_listings(&query, PageRequest::default()).await.unwrap();
    assert_eq!(filtered.items.len(), 1);
    assert_eq!(filtered.items[0].title, "Large");

    // Nothing is verified yet.
    let verified = repo
        .search_listings(&ctx.in_town().and(Predicate::Verified), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(verified.meta.total, 0);

    let second = repo
        .search_listings(&ctx.in_town(), PageRequest::new(Some(2), Some(2)))
        .await
        .unwrap();
    assert_eq!(second.meta.pages, 2);
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].title, "Small");

    // LIKE metacharacters in the needle match literally.
    let wildcard = repo
        .search_listings(
            &ListingQuery::new().and(Predicate::LocationContains(format!("%{}", ctx.tag))),
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(wildcard.meta.total, 0);
}

#[tokio::test]
#[ignore]
async fn test_listing_verification_and_update() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = repo
        .create_account(ctx.new_account("vera", Role::Admin))
        .await
        .unwrap();
    let listing = repo
        .create_listing(owner.id, ctx.listing("Bungalow", 180_000, 3))
        .await
        .unwrap();

    let verified = repo
        .set_verification(listing.id, true, Some("Checked deeds".to_string()))
        .await
        .unwrap()
        .expect("listing exists");
    assert!(verified.is_verified);
    assert_eq!(verified.verification_notes.as_deref(), Some("Checked deeds"));

    let updated = repo
        .update_listing(
            listing.id,
            UpdateListingRequest {
                price: Some(Decimal::new(17_500_000, 2)),
                ..UpdateListingRequest::default()
            },
        )
        .await
        .unwrap()
        .expect("listing exists");
    assert_eq!(updated.price, Decimal::new(17_500_000, 2));
    assert!(!updated.is_verified);

    let with_images = repo
        .append_images(listing.id, vec!["http://img/1.png".to_string()])
        .await
        .unwrap()
        .expect("listing exists");
    assert!(with_images.images.unwrap_or_default().contains("http://img/1.png"));

    assert!(repo.update_listing(Uuid::new_v4(), UpdateListingRequest::default()).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_blank_update_clears_optional_text() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = repo
        .create_account(ctx.new_account("nora", Role::Admin))
        .await
        .unwrap();
    let mut request = ctx.listing("Mews", 220_000, 2);
    request.description = Some("Quiet lane".to_string());
    request.address = Some("4 Mews Lane".to_string());
    let listing = repo.create_listing(owner.id, request).await.unwrap();

    let updated = repo
        .update_listing(
            listing.id,
            UpdateListingRequest {
                description: Some(String::new()),
                ..UpdateListingRequest::default()
            },
        )
        .await
        .unwrap()
        .expect("listing exists");
    assert_eq!(updated.description, None);
    assert_eq!(updated.address.as_deref(), Some("4 Mews Lane"));
}

#[tokio::test]
#[ignore]
async fn test_foreign_key_violations_are_missing_references() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let orphan = repo
        .create_listing(Uuid::new_v4(), ctx.listing("Nowhere", 1, 0))
        .await;
    assert!(matches!(orphan, Err(StoreError::MissingReference(m)) if m == "Owner account not found"));

    let client = repo
        .create_account(ctx.new_account("hugo", Role::Client))
        .await
        .unwrap();
    let favorite = repo.add_favorite(client.id, Uuid::new_v4()).await;
    assert!(matches!(favorite, Err(StoreError::MissingReference(m)) if m == "Property not found"));
}

// --- Favorites and cascades ---

#[tokio::test]
#[ignore]
async fn test_favorites_and_delete_cascade() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = repo
        .create_account(ctx.new_account("finn", Role::Admin))
        .await
        .unwrap();
    let client = repo
        .create_account(ctx.new_account("gwen", Role::Client))
        .await
        .unwrap();
    let listing = repo
        .create_listing(owner.id, ctx.listing("Cabin", 90_000, 2))
        .await
        .unwrap();

    assert!(repo.add_favorite(client.id, listing.id).await.unwrap());
    assert!(!repo.add_favorite(client.id, listing.id).await.unwrap());
    assert!(repo.is_favorite(client.id, listing.id).await.unwrap());

    // Unverified listings are filtered when asked.
    let hidden = repo
        .favorite_listings(client.id, true, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(hidden.meta.total, 0);
    let all = repo
        .favorite_listings(client.id, false, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(all.meta.total, 1);

    let inquiry = repo
        .create_inquiry(NewInquiry {
            name: "Gwen".to_string(),
            email: client.email.clone(),
            phone: None,
            subject: Some("Viewing".to_string()),
            message: "Is Sunday possible?".to_string(),
            listing_id: Some(listing.id),
            sender_id: Some(client.id),
        })
        .await
        .unwrap();
    assert_eq!(inquiry.listing_title.as_deref(), Some("Cabin"));
    assert_eq!(inquiry.status, InquiryStatus::Unread);

    let deleted = repo.delete_listing(listing.id).await.unwrap();
    assert_eq!(deleted.map(|l| l.id), Some(listing.id));
    assert!(!repo.is_favorite(client.id, listing.id).await.unwrap());

    let kept = repo
        .get_inquiry(inquiry.id)
        .await
        .unwrap()
        .expect("inquiry survives");
    assert_eq!(kept.listing_id, None);

    // Deleting the sender nulls the inquiry sender.
    assert!(repo.delete_account(client.id).await.unwrap());
    let kept = repo.get_inquiry(inquiry.id).await.unwrap().unwrap();
    assert_eq!(kept.sender_id, None);

    let filter = InquiryFilter {
        status: Some(InquiryStatus::Unread),
        ..InquiryFilter::default()
    };
    let unread = repo.list_inquiries(&filter, PageRequest::default()).await.unwrap();
    assert!(unread.items.iter().any(|i| i.id == inquiry.id));

    let read = repo
        .set_inquiry_status(inquiry.id, InquiryStatus::Read)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read.status, InquiryStatus::Read);
    assert!(repo.delete_inquiry(inquiry.id).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_stats_count_rows() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let before = repo.get_stats().await.unwrap();
    let owner = repo
        .create_account(ctx.new_account("sam", Role::Admin))
        .await
        .unwrap();
    repo.create_listing(owner.id, ctx.listing("Studio", 50_000, 0))
        .await
        .unwrap();
    let after = repo.get_stats().await.unwrap();

    assert!(after.total_accounts >= before.total_accounts + 1);
    assert!(after.total_listings >= before.total_listings + 1);
    assert_eq!(
        after.total_listings,
        after.verified_listings + after.pending_verification
    );
}
