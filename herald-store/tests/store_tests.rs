#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::{io::Write, time::Duration};

use herald_common::{
    DeliveryStatus, EmailIntent, EmailStatus, Kind, ResourceKey, Secret, SenderConfig,
};
use herald_store::{
    Change, MemoryStore, ResourceStore, ResourceStoreExt, StoreConfig, StoreError, TestStore,
};

const MANIFEST: &str = r#"[
    {
        "kind": "Email",
        "metadata": { "name": "sample-email" },
        "spec": {
            "recipientEmail": "recipient@example.com",
            "subject": "Sample Email",
            "body": "This is a sample email.",
            "senderConfigRef": "sample-senderconfig"
        }
    },
    {
        "kind": "EmailSenderConfig",
        "metadata": { "name": "sample-senderconfig" },
        "spec": { "apiTokenSecretRef": "mailersend-token" }
    },
    {
        "kind": "Secret",
        "metadata": { "name": "mailersend-token" },
        "data": { "api-token": "dG9rZW4=", "from-email": "c2VuZGVyQGV4YW1wbGUuY29t" }
    }
]"#;

fn manifest_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(MANIFEST.as_bytes()).expect("write manifest");
    file
}

#[tokio::test]
async fn test_load_manifest_and_fetch_typed() {
    let file = manifest_file();
    let store = MemoryStore::new();

    let count = store.load_manifest(file.path()).await.expect("load");
    assert_eq!(count, 3);

    let email: EmailIntent = store
        .fetch(&ResourceKey::new("default", "sample-email"))
        .await
        .expect("email");
    assert_eq!(email.spec.subject, "Sample Email");
    assert_eq!(email.status.delivery_status, DeliveryStatus::Pending);

    let configs: Vec<SenderConfig> = store.fetch_all(Some("default")).await.expect("configs");
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].spec.api_token_secret_ref, "mailersend-token");

    let secrets: Vec<Secret> = store.fetch_all(None).await.expect("secrets");
    assert_eq!(secrets[0].data.len(), 2);
}

#[tokio::test]
async fn test_store_config_builds_seeded_store() {
    let file = manifest_file();
    let config = StoreConfig::Memory {
        seed: Some(file.path().to_path_buf()),
        watch_capacity: 16,
    };

    let store = config.build().await.expect("store");
    assert_eq!(store.list(Kind::Email, None).await.expect("list").len(), 1);
}

#[tokio::test]
async fn test_invalid_manifest_is_reported() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(b"{ not json").expect("write");

    let result = MemoryStore::new().load_manifest(file.path()).await;
    assert!(matches!(result, Err(StoreError::Manifest(_))));
}

#[tokio::test]
async fn test_fetch_wrong_key_is_not_found() {
    let store = MemoryStore::new();
    let result = store
        .fetch::<EmailIntent>(&ResourceKey::new("default", "missing"))
        .await;
    assert!(result.is_err_and(|e| e.is_not_found()));
}

#[tokio::test]
async fn test_write_status_round_trips_through_typed_api() {
    let file = manifest_file();
    let store = MemoryStore::new();
    store.load_manifest(file.path()).await.expect("load");

    let key = ResourceKey::new("default", "sample-email");
    let mut email: EmailIntent = store.fetch(&key).await.expect("email");
    email.status = EmailStatus::sent("msg-1");

    let written = store.write_status(email).await.expect("write");
    assert_eq!(written.status.message_id, "msg-1");
    assert_eq!(written.metadata.resource_version, 2);
}

#[tokio::test]
async fn test_injected_conflict_is_a_real_version_conflict() {
    let file = manifest_file();
    let store = TestStore::new();
    store.inner().load_manifest(file.path()).await.expect("load");
    store.inject_conflicts(1);

    let key = ResourceKey::new("default", "sample-email");
    let email: EmailIntent = store.fetch(&key).await.expect("email");

    let first = store.write_status(email).await;
    assert!(first.is_err_and(|e| e.is_conflict()));

    let reloaded: EmailIntent = store.fetch(&key).await.expect("email");
    store.write_status(reloaded).await.expect("second write");

    assert_eq!(store.status_write_attempts(), 2);
    assert_eq!(store.status_write_count(), 1);
    assert_eq!(store.get_count(), 2);
}

#[tokio::test]
async fn test_wait_for_status_writes() {
    let file = manifest_file();
    let store = TestStore::new();
    store.inner().load_manifest(file.path()).await.expect("load");

    let writer = store.clone();
    tokio::spawn(async move {
        let email: EmailIntent = writer
            .fetch(&ResourceKey::new("default", "sample-email"))
            .await
            .expect("email");
        writer.write_status(email).await.expect("write");
    });

    store
        .wait_for_status_writes(1, Duration::from_secs(5))
        .await
        .expect("status write observed");
}

#[tokio::test]
async fn test_unavailable_store_fails_reads_and_pings() {
    let store = TestStore::new();
    store.set_unavailable(true);

    assert!(store.ping().await.is_err());
    assert!(store.list(Kind::Email, None).await.is_err());

    store.set_unavailable(false);
    assert!(store.ping().await.is_ok());
}

#[tokio::test]
async fn test_watch_reports_spec_changes_and_deletes() {
    let store = MemoryStore::new();
    let mut events = store.watch();

    let file = manifest_file();
    store.load_manifest(file.path()).await.expect("load");

    let kinds: Vec<_> = (0..3)
        .map(|_| events.try_recv().expect("event").kind)
        .collect();
    assert_eq!(kinds, vec![Kind::Email, Kind::SenderConfig, Kind::Secret]);

    store
        .delete(Kind::Secret, &ResourceKey::new("default", "mailersend-token"))
        .await
        .expect("delete");
    let event = events.try_recv().expect("delete event");
    assert_eq!(event.change, Change::Deleted);
    assert_eq!(event.kind, Kind::Secret);
}
