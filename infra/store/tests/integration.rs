use sgrid_store::{Compression, Store, StoreError};
use std::time::Duration;
use tempfile::tempdir;

async fn connect(root: &std::path::Path, compression: Compression) -> Store {
    Store::builder()
        .root(root)
        .compression(compression)
        .connect()
        .await
        .expect("store should connect")
}

#[tokio::test]
async fn write_read_remove_roundtrip() {
    let tmp = tempdir().unwrap();
    let store = connect(&tmp.path().join("data"), Compression::Lz4).await;
    let web = store.namespace("web").unwrap();

    web.write_record("aBcDeFgH1234", b"session state").await.unwrap();
    assert!(web.contains("aBcDeFgH1234").unwrap());

    let bytes = web.read_record("aBcDeFgH1234").await.unwrap();
    assert_eq!(bytes, b"session state");

    web.remove_record("aBcDeFgH1234").await.unwrap();
    let err = web.read_record("aBcDeFgH1234").await.unwrap_err();
    assert!(matches!(err, StoreError::RecordNotFound { .. }));
}

#[tokio::test]
async fn records_shard_by_id_prefix() {
    let tmp = tempdir().unwrap();
    let store = connect(&tmp.path().join("data"), Compression::None).await;
    let web = store.namespace("web").unwrap();

    web.write_record("abcd1234", b"x").await.unwrap();

    let sharded = tmp.path().join("data").join("web").join("ab").join("cd").join("abcd1234.rec");
    assert!(sharded.exists(), "expected sharded path at {}", sharded.display());
}

#[tokio::test]
async fn short_ids_skip_sharding() {
    let tmp = tempdir().unwrap();
    let store = connect(&tmp.path().join("data"), Compression::None).await;
    let web = store.namespace("web").unwrap();

    web.write_record("abc", b"x").await.unwrap();
    assert!(tmp.path().join("data").join("web").join("abc.rec").exists());
}

#[tokio::test]
async fn overwrite_replaces_previous_record() {
    let tmp = tempdir().unwrap();
    let store = connect(&tmp.path().join("data"), Compression::Lz4).await;
    let web = store.namespace("web").unwrap();

    web.write_record("abcd1234", b"first").await.unwrap();
    web.write_record("abcd1234", b"second").await.unwrap();

    assert_eq!(web.read_record("abcd1234").await.unwrap(), b"second");
    assert_eq!(web.list_records().await.unwrap(), vec!["abcd1234".to_owned()]);
}

#[tokio::test]
async fn namespaces_are_isolated() {
    let tmp = tempdir().unwrap();
    let store = connect(&tmp.path().join("data"), Compression::None).await;
    let web = store.namespace("web").unwrap();
    let api = store.namespace("api").unwrap();

    web.write_record("abcd1234", b"web").await.unwrap();
    api.write_record("abcd1234", b"api").await.unwrap();

    assert_eq!(web.read_record("abcd1234").await.unwrap(), b"web");
    assert_eq!(api.read_record("abcd1234").await.unwrap(), b"api");

    assert_eq!(web.clear().await, 1);
    assert!(api.contains("abcd1234").unwrap());
}

#[tokio::test]
async fn illegal_names_are_rejected() {
    let tmp = tempdir().unwrap();
    let store = connect(&tmp.path().join("data"), Compression::None).await;

    assert!(matches!(store.namespace(""), Err(StoreError::InvalidName { .. })));
    assert!(matches!(store.namespace("../evil"), Err(StoreError::InvalidName { .. })));

    let web = store.namespace("web").unwrap();
    let err = web.write_record("../../etc/passwd", b"x").await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidName { .. }));
}

#[tokio::test]
async fn list_records_survives_restart() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("data");

    {
        let store = connect(&root, Compression::Lz4).await;
        let web = store.namespace("web").unwrap();
        web.write_record("aaaa1111", b"one").await.unwrap();
        web.write_record("bbbb2222", b"two").await.unwrap();
    }

    let store = connect(&root, Compression::Lz4).await;
    let web = store.namespace("web").unwrap();
    let mut ids = web.list_records().await.unwrap();
    ids.sort();
    assert_eq!(ids, vec!["aaaa1111".to_owned(), "bbbb2222".to_owned()]);
}

#[tokio::test]
async fn stale_records_are_purged_by_age() {
    let tmp = tempdir().unwrap();
    let store = connect(&tmp.path().join("data"), Compression::None).await;
    let web = store.namespace("web").unwrap();

    web.write_record("abcd1234", b"x").await.unwrap();

    // Everything is younger than an hour: nothing removed.
    assert_eq!(store.purge_stale_records(Duration::from_secs(3600)).await, 0);

    // Zero max-age: the record is stale immediately.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(store.purge_stale_records(Duration::ZERO).await, 1);
    assert!(!web.contains("abcd1234").unwrap());
}
