use realty_portal::{
    ApiError, MockStorageService,
    storage::{StorageService, UploadPolicy, key_from_url, object_key, public_url},
};

const BASE: &str = "http://localhost:9000/realty-test";

// --- Upload policy ---

#[test]
fn test_policy_accepts_allowed_extensions_case_insensitively() {
    let policy = UploadPolicy::default();
    assert_eq!(policy.validate("front.JPG", 10).unwrap(), "jpg");
    assert_eq!(policy.validate("plan.final.webp", 10).unwrap(), "webp");
    assert_eq!(policy.validate("x.Jpeg", 1).unwrap(), "jpeg");
}

#[test]
fn test_policy_rejections() {
    let policy = UploadPolicy {
        max_file_bytes: 100,
        ..UploadPolicy::default()
    };
    for (name, size) in [
        ("notes.txt", 10),
        ("no_extension", 10),
        ("archive.png.zip", 10),
        ("empty.png", 0),
        ("huge.png", 101),
    ] {
        let result = policy.validate(name, size);
        assert!(matches!(result, Err(ApiError::Validation(_))), "{name}");
    }
    assert!(policy.validate("exact.png", 100).is_ok());
}

#[test]
fn test_request_body_limit_covers_batch() {
    let policy = UploadPolicy::default();
    assert!(policy.request_body_limit() > policy.max_total_bytes);
    assert!(policy.request_body_limit() > policy.max_file_bytes);
}

// --- Object keys and URLs ---

#[test]
fn test_object_key_format() {
    let key = object_key("Living Room.png", "png");
    let rest = key.strip_prefix("uploads/images/Living_Room_").unwrap();
    let (suffix, extension) = rest.split_once('.').unwrap();
    assert_eq!(suffix.len(), 8);
    assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(extension, "png");

    assert_ne!(object_key("a.png", "png"), object_key("a.png", "png"));
}

#[test]
fn test_object_key_strips_paths() {
    for name in ["../../etc/passwd.png", "..\\..\\boot.png", "/abs/dir/pic.png"] {
        let key = object_key(name, "png");
        assert!(key.starts_with("uploads/images/"), "{key}");
        assert!(!key.contains(".."), "{key}");
        assert_eq!(key.matches('/').count(), 2, "{key}");
    }
    assert!(object_key("../../etc/passwd.png", "png").starts_with("uploads/images/passwd_"));
    assert!(object_key("....png", "png").starts_with("uploads/images/image_"));
}

#[test]
fn test_public_url_round_trip() {
    let url = public_url(&format!("{BASE}/"), "uploads/images/a_1234abcd.png");
    assert_eq!(url, format!("{BASE}/uploads/images/a_1234abcd.png"));
    assert_eq!(
        key_from_url(BASE, &url).as_deref(),
        Some("uploads/images/a_1234abcd.png")
    );

    assert_eq!(key_from_url(BASE, "https://cdn.example.com/uploads/a.png"), None);
    assert_eq!(key_from_url(BASE, &format!("{BASE}/private/a.png")), None);
}

// --- Mock storage ---

#[tokio::test]
async fn test_mock_storage_store_and_delete() {
    let storage = MockStorageService::new();
    storage
        .store("uploads/images/a.png", vec![1, 2, 3], "image/png")
        .await
        .unwrap();
    storage
        .store("uploads/images/b.png", vec![4], "image/png")
        .await
        .unwrap();
    assert_eq!(
        storage.keys(),
        vec!["uploads/images/a.png", "uploads/images/b.png"]
    );

    storage.delete("uploads/images/a.png").await.unwrap();
    // Deleting a missing key is not an error.
    storage.delete("uploads/images/missing.png").await.unwrap();
    assert_eq!(storage.keys(), vec!["uploads/images/b.png"]);
}

#[tokio::test]
async fn test_failing_mock_storage() {
    let storage = MockStorageService::new_failing();
    assert!(storage.store("k", vec![1], "image/png").await.is_err());
    assert!(storage.delete("k").await.is_err());
    assert!(storage.keys().is_empty());
}
