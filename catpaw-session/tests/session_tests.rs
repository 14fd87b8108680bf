use catpaw_session::*;
use std::time::Duration;

#[tokio::test]
async fn test_memory_validate_starts_new_session() {
    let store = MemorySessionStore::default();

    let session = store.validate(None).await.unwrap();
    assert!(is_valid_session_id(&session.id));
    assert_eq!(store.count().await.unwrap(), 1);

    let unknown = store.validate(Some("missing")).await.unwrap();
    assert_ne!(unknown.id, "missing");
    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_memory_validate_returns_existing_session() {
    let store = MemorySessionStore::default();

    let mut session = store.validate(None).await.unwrap();
    session.set("user", "alice").unwrap();
    store.save(&session).await.unwrap();

    let again = store.validate(Some(&session.id)).await.unwrap();
    assert_eq!(again.id, session.id);
    assert_eq!(again.get::<String>("user").as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_memory_expired_session_is_replaced() {
    let store = MemorySessionStore::new(SessionConfig::memory().with_default_ttl(Duration::ZERO));

    let session = store.create(None).await.unwrap();
    assert!(store.get(&session.id).await.unwrap().is_none());

    let replacement = store.validate(Some(&session.id)).await.unwrap();
    assert_ne!(replacement.id, session.id);
}

#[tokio::test]
async fn test_memory_cleanup_expired() {
    let store = MemorySessionStore::default();
    store.create(Some(Duration::ZERO)).await.unwrap();
    store.create(Some(Duration::ZERO)).await.unwrap();
    store.create(None).await.unwrap();

    assert_eq!(store.cleanup_expired().await.unwrap(), 2);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_filesystem_persists_storage_and_time() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSystemSessionStore::new(dir.path(), Duration::from_secs(60), false);

    let mut session = store.validate(None).await.unwrap();
    session.set("counter", 3).unwrap();
    store.save(&session).await.unwrap();

    let raw = std::fs::read_to_string(dir.path().join(&session.id)).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["STORAGE"]["counter"], 3);
    assert!(json["TIME"].is_i64());

    // A fresh store only sees the file.
    let reopened = FileSystemSessionStore::new(dir.path(), Duration::from_secs(60), false);
    let loaded = reopened.get(&session.id).await.unwrap().unwrap();
    assert_eq!(loaded.get::<i32>("counter"), Some(3));
    assert!(reopened.exists(&session.id).await.unwrap());
}

#[tokio::test]
async fn test_filesystem_expired_file_is_removed() {
    let dir = tempfile::tempdir().unwrap();
    let id = generate_session_id();
    std::fs::write(
        dir.path().join(&id),
        r#"{"STORAGE":{"a":1},"TIME":1000}"#,
    )
    .unwrap();

    let store = FileSystemSessionStore::new(dir.path(), Duration::from_secs(60), false);
    let session = store.validate(Some(&id)).await.unwrap();

    assert_ne!(session.id, id);
    assert!(!dir.path().join(&id).exists());
}

#[tokio::test]
async fn test_filesystem_keep_alive_refreshes_time() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSystemSessionStore::new(dir.path(), Duration::from_secs(3600), true);

    let id = generate_session_id();
    let stale = chrono::Utc::now().timestamp() - 1800;
    std::fs::write(
        dir.path().join(&id),
        format!(r#"{{"STORAGE":{{}},"TIME":{}}}"#, stale),
    )
    .unwrap();

    let session = store.validate(Some(&id)).await.unwrap();
    assert_eq!(session.id, id);

    let raw = std::fs::read_to_string(dir.path().join(&id)).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(json["TIME"].as_i64().unwrap() > stale);
}

#[tokio::test]
async fn test_filesystem_rejects_path_traversal_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSystemSessionStore::new(dir.path(), Duration::from_secs(60), false);

    assert!(store.get("../secret").await.unwrap().is_none());
    let session = store.validate(Some("../secret")).await.unwrap();
    assert!(is_valid_session_id(&session.id));
}

#[tokio::test]
async fn test_store_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig::filesystem(dir.path()).unwrap();
    let store = store_from_config(&config).unwrap();

    store.create(None).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);

    store.clear_all().await.unwrap();
    assert_eq!(store.count().await.unwrap(), 0);
}
