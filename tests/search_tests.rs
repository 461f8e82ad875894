mod common;

use axum::{extract::Query, http::Uri};
use common::{listing_request, test_context};
use realty_portal::{
    ApiError,
    models::{ListingRecord, ListingStatus, PropertyType, UpdateListingRequest},
    repository::Repository,
    search::{
        self,
        assembler::{assemble, decode_string_list},
        pagination::{MAX_PER_PAGE, PageRequest},
        predicate::{ListingFilters, ListingQuery, Predicate},
        visibility,
    },
};
use rust_decimal::Decimal;
use std::collections::HashSet;
use uuid::Uuid;

fn filters(query: &str) -> ListingFilters {
    let uri: Uri = format!("/api/properties?{query}").parse().unwrap();
    Query::<ListingFilters>::try_from_uri(&uri).unwrap().0
}

// --- Pagination ---

#[test]
fn test_page_request_clamps_out_of_range_input() {
    let page = PageRequest::new(Some(0), Some(1000));
    assert_eq!(page.page(), 1);
    assert_eq!(page.per_page(), MAX_PER_PAGE);

    let page = PageRequest::new(Some(-3), Some(0));
    assert_eq!(page.page(), 1);
    assert_eq!(page.per_page(), 1);

    let page = PageRequest::new(None, None);
    assert_eq!((page.page(), page.per_page()), (1, 20));
}

#[test]
fn test_page_meta_for_five_items_two_per_page() {
    let meta = PageRequest::new(Some(3), Some(2)).meta(5);
    assert_eq!(meta.pages, 3);
    assert!(meta.has_prev);
    assert!(!meta.has_next);

    let meta = PageRequest::new(Some(1), Some(2)).meta(5);
    assert!(!meta.has_prev);
    assert!(meta.has_next);
}

#[test]
fn test_page_meta_for_empty_result() {
    let meta = PageRequest::new(Some(1), Some(20)).meta(0);
    assert_eq!(meta.total, 0);
    assert_eq!(meta.pages, 0);
    assert!(!meta.has_prev);
    assert!(!meta.has_next);
}

// --- Filters ---

#[test]
fn test_filters_accept_aliases() {
    let f = filters("category=condo&min_rooms=2");
    assert_eq!(f.property_type, Some(PropertyType::Condo));
    assert_eq!(f.bedrooms, Some(2));
}

#[test]
fn test_status_defaults_to_available() {
    let query = filters("").to_query().unwrap();
    assert!(query.contains(&Predicate::StatusIs(ListingStatus::Available)));

    let query = filters("status=sold").to_query().unwrap();
    assert!(query.contains(&Predicate::StatusIs(ListingStatus::Sold)));
    assert!(!query.contains(&Predicate::StatusIs(ListingStatus::Available)));
}

#[test]
fn test_negative_filters_are_rejected() {
    for q in [
        "min_price=-1",
        "max_price=-10.5",
        "bedrooms=-2",
        "max_price=100000000000",
        "min_price=10000000000",
    ] {
        let result = filters(q).to_query();
        assert!(
            matches!(result, Err(ApiError::Validation(_))),
            "{q} should be rejected"
        );
    }
}

#[test]
fn test_largest_storable_price_is_a_valid_filter() {
    assert!(filters("min_price=0&max_price=9999999999.99").to_query().is_ok());
}

#[test]
fn test_blank_location_imposes_no_constraint() {
    let query = filters("location=%20%20").to_query().unwrap();
    assert_eq!(query.predicates().len(), 1);
}

#[test]
fn test_applied_filters_echo_defaults() {
    let applied = filters("location=Austin&per_page=5").applied();
    assert_eq!(applied.location.as_deref(), Some("Austin"));
    assert_eq!(applied.status, Some(ListingStatus::Available));
    assert_eq!(applied.page, Some(1));
    assert_eq!(applied.per_page, Some(5));
    assert_eq!(applied.show_all, Some(false));
}

#[test]
fn test_predicates_evaluate_in_process() {
    let record = ListingRecord {
        location: "Downtown Austin, TX".to_string(),
        price: Decimal::from(300_000),
        bedrooms: Some(3),
        property_type: PropertyType::House,
        is_verified: true,
        ..ListingRecord::default()
    };

    assert!(Predicate::LocationContains("austin".to_string()).matches(&record));
    assert!(!Predicate::LocationContains("dallas".to_string()).matches(&record));
    assert!(Predicate::PriceAtLeast(Decimal::from(300_000)).matches(&record));
    assert!(Predicate::PriceAtMost(Decimal::from(300_000)).matches(&record));
    assert!(!Predicate::PriceAtMost(Decimal::from(299_999)).matches(&record));
    assert!(Predicate::BedroomsAtLeast(3).matches(&record));
    assert!(!Predicate::BedroomsAtLeast(4).matches(&record));

    let no_bedrooms = ListingRecord {
        bedrooms: None,
        ..record.clone()
    };
    assert!(!Predicate::BedroomsAtLeast(0).matches(&no_bedrooms));

    let query = ListingQuery::new()
        .and(Predicate::Verified)
        .and(Predicate::PropertyTypeIs(PropertyType::Condo));
    assert!(!query.matches(&record));
    assert!(ListingQuery::new().matches(&record));
}

// --- Visibility ---

#[tokio::test]
async fn test_visibility_requires_permission_and_show_all() {
    let ctx = test_context();
    let client = ctx.client("carol").await;
    let admin = ctx.admin("adam").await;

    assert!(!visibility::reveals_unverified(None, true));
    assert!(!visibility::reveals_unverified(Some(&client), true));
    assert!(!visibility::reveals_unverified(Some(&admin), false));
    assert!(visibility::reveals_unverified(Some(&admin), true));

    let base = ListingQuery::new();
    assert!(visibility::apply(base.clone(), Some(&admin), false).contains(&Predicate::Verified));
    assert_eq!(visibility::apply(base.clone(), Some(&admin), true), base);
}

#[tokio::test]
async fn test_search_hides_unverified_listings() {
    let ctx = test_context();
    let admin = ctx.admin("adam").await;
    let client = ctx.client("carol").await;

    ctx.listing(None, listing_request("Verified", "Austin", 100, Some(2), PropertyType::House), true)
        .await;
    ctx.listing(None, listing_request("Pending", "Austin", 100, Some(2), PropertyType::House), false)
        .await;

    let show_all = filters("show_all=true");
    let repo = ctx.state.repo.as_ref();

    let anonymous = search::search_listings(repo, &show_all, None).await.unwrap();
    assert_eq!(anonymous.pagination.total, 1);
    assert_eq!(anonymous.properties[0].title, "Verified");

    let as_client = search::search_listings(repo, &show_all, Some(&client)).await.unwrap();
    assert_eq!(as_client.pagination.total, 1);

    let admin_default = search::search_listings(repo, &filters(""), Some(&admin)).await.unwrap();
    assert_eq!(admin_default.pagination.total, 1);

    let admin_all = search::search_listings(repo, &show_all, Some(&admin)).await.unwrap();
    assert_eq!(admin_all.pagination.total, 2);
}

#[tokio::test]
async fn test_hidden_listing_is_not_found_by_id() {
    let ctx = test_context();
    let admin = ctx.admin("adam").await;
    let pending = ctx
        .listing(None, listing_request("Pending", "Austin", 100, None, PropertyType::Land), false)
        .await;
    let repo = ctx.state.repo.as_ref();

    let anonymous = search::find_visible_listing(repo, pending.id, None, true).await;
    assert!(matches!(anonymous, Err(ApiError::NotFound(_))));

    let admin_default = search::find_visible_listing(repo, pending.id, Some(&admin), false).await;
    assert!(matches!(admin_default, Err(ApiError::NotFound(_))));

    let admin_all = search::find_visible_listing(repo, pending.id, Some(&admin), true).await;
    assert_eq!(admin_all.unwrap().id, pending.id);

    let missing = search::find_visible_listing(repo, Uuid::new_v4(), Some(&admin), true).await;
    assert!(matches!(missing, Err(ApiError::NotFound(_))));
}

// --- Filtering over the store ---

#[tokio::test]
async fn test_filters_combine_conjunctively() {
    let ctx = test_context();
    let seed = [
        ("Loft", "Austin Downtown", 250_000, Some(1), PropertyType::Apartment),
        ("Family Home", "South Austin", 450_000, Some(4), PropertyType::House),
        ("Ranch", "Dallas", 600_000, Some(5), PropertyType::House),
        ("Lot", "austin outskirts", 80_000, None, PropertyType::Land),
    ];
    for (title, location, price, bedrooms, t) in seed {
        ctx.listing(None, listing_request(title, location, price, bedrooms, t), true)
            .await;
    }
    let repo = ctx.state.repo.as_ref();

    let page = search::search_listings(repo, &filters("location=AUSTIN"), None)
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 3);

    let page = search::search_listings(
        repo,
        &filters("location=austin&property_type=house&min_price=400000&bedrooms=3"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(page.pagination.total, 1);
    assert_eq!(page.properties[0].title, "Family Home");

    let page = search::search_listings(repo, &filters("min_price=100000&max_price=500000"), None)
        .await
        .unwrap();
    let titles: HashSet<_> = page.properties.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, HashSet::from(["Loft", "Family Home"]));
}

#[tokio::test]
async fn test_inverted_price_range_matches_nothing() {
    let ctx = test_context();
    ctx.listing(None, listing_request("Loft", "Austin", 250_000, None, PropertyType::Condo), true)
        .await;

    let page = search::search_listings(
        ctx.state.repo.as_ref(),
        &filters("min_price=500000&max_price=100000"),
        None,
    )
    .await
    .unwrap();
    assert!(page.properties.is_empty());
    assert_eq!(page.pagination.total, 0);
    assert_eq!(page.pagination.pages, 0);
}

#[tokio::test]
async fn test_pages_partition_the_result_newest_first() {
    let ctx = test_context();
    let mut created = Vec::new();
    for i in 0..5 {
        let listing = ctx
            .listing(
                None,
                listing_request(&format!("Listing {i}"), "Austin", 100_000, Some(2), PropertyType::House),
                true,
            )
            .await;
        created.push(listing.id);
    }
    let repo = ctx.state.repo.as_ref();

    let mut seen = Vec::new();
    for page_no in 1..=3 {
        let page = search::search_listings(
            repo,
            &filters(&format!("page={page_no}&per_page=2")),
            None,
        )
        .await
        .unwrap();
        assert_eq!(page.pagination.total, 5);
        assert_eq!(page.pagination.pages, 3);
        assert_eq!(page.pagination.has_prev, page_no > 1);
        assert_eq!(page.pagination.has_next, page_no < 3);
        seen.extend(page.properties.iter().map(|p| p.id));
    }

    created.reverse();
    assert_eq!(seen, created, "pages should be disjoint, complete and newest first");

    let beyond = search::search_listings(repo, &filters("page=4&per_page=2"), None)
        .await
        .unwrap();
    assert!(beyond.properties.is_empty());
    assert_eq!(beyond.pagination.total, 5);
}

#[tokio::test]
async fn test_editing_a_listing_withdraws_verification() {
    let ctx = test_context();
    let listing = ctx
        .listing(None, listing_request("Loft", "Austin", 100, None, PropertyType::Condo), true)
        .await;

    let updated = ctx
        .repo
        .update_listing(
            listing.id,
            UpdateListingRequest {
                title: Some("Renovated Loft".to_string()),
                ..UpdateListingRequest::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(!updated.is_verified);
    assert_eq!(updated.title, "Renovated Loft");

    let page = search::search_listings(ctx.state.repo.as_ref(), &filters(""), None)
        .await
        .unwrap();
    assert!(page.properties.is_empty());
}

// --- Assembly ---

#[test]
fn test_corrupt_stored_lists_decode_to_empty() {
    let id = Uuid::new_v4();
    assert!(decode_string_list(Some("not json"), "features", id).is_empty());
    assert!(decode_string_list(Some("{\"a\":1}"), "features", id).is_empty());
    assert!(decode_string_list(None, "images", id).is_empty());
    assert_eq!(
        decode_string_list(Some("[\"pool\",\"garage\"]"), "features", id),
        vec!["pool", "garage"]
    );
}

#[tokio::test]
async fn test_corrupt_listing_is_still_served() {
    let ctx = test_context();
    let id = Uuid::new_v4();
    ctx.repo
        .insert_raw_listing(ListingRecord {
            id,
            title: "Legacy".to_string(),
            location: "Austin".to_string(),
            features: Some("[broken".to_string()),
            images: Some("[\"http://img/1.jpg\"]".to_string()),
            is_verified: true,
            ..ListingRecord::default()
        })
        .await;

    let page = search::search_listings(ctx.state.repo.as_ref(), &filters(""), None)
        .await
        .unwrap();
    assert_eq!(page.properties.len(), 1);
    assert!(page.properties[0].features.is_empty());
    assert_eq!(page.properties[0].images, vec!["http://img/1.jpg"]);
}

#[tokio::test]
async fn test_assemble_embeds_owner_summary() {
    let ctx = test_context();
    let owner = ctx.admin("agent").await;
    let listing = ctx
        .listing(
            Some(owner.id),
            listing_request("Loft", "Austin", 100, None, PropertyType::Condo),
            true,
        )
        .await;

    let response = assemble(listing);
    let summary = response.owner.expect("owner should be embedded");
    assert_eq!(summary.id, owner.id);
    assert_eq!(summary.username, "agent");
    // No first/last name: the username stands in.
    assert_eq!(summary.name, "agent");
}
