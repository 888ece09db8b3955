use bytes::Bytes;
use futures::stream;

use dashboard_sync_core::contract::{
    ByteStream, MediaDownload, MockMediaFetcher, MockObjectStore, ObjectStore,
};
use dashboard_sync_core::error::{MediaError, ProviderError, StoreError};
use dashboard_sync_core::media::{fetch_and_upload_file, list_stored_media, MediaUploadResult};
use dashboard_sync_core::memory::MemoryObjectStore;

fn body_of(chunks: &[&'static str], failure: Option<&'static str>) -> ByteStream {
    let items: Vec<Result<Bytes, std::io::Error>> = chunks
        .iter()
        .map(|chunk| Ok(Bytes::from_static(chunk.as_bytes())))
        .chain(failure.map(|message| Err(std::io::Error::other(message))))
        .collect();
    Box::pin(stream::iter(items))
}

fn fetcher_returning(content_type: &'static str, chunks: fn() -> ByteStream) -> MockMediaFetcher {
    let mut fetcher = MockMediaFetcher::new();
    fetcher.expect_fetch().times(1).returning(move |_url| {
        Ok(MediaDownload {
            content_type: Some(content_type.to_string()),
            body: chunks(),
        })
    });
    fetcher
}

#[tokio::test]
async fn test_successful_upload_returns_id_and_destination() {
    let fetcher = fetcher_returning("image/jpeg", || {
        body_of(&["JFIF", "-body"], None)
    });
    let store = MemoryObjectStore::new();

    let result = fetch_and_upload_file(
        &fetcher,
        &store,
        "rec-1",
        Some("https://i.discogs.com/rec-1.jpg"),
        "covers/rec-1.jpg",
        Some("public, max-age=60"),
    )
    .await
    .unwrap();

    assert_eq!(
        result,
        MediaUploadResult {
            id: "rec-1".to_string(),
            file_name: "covers/rec-1.jpg".to_string(),
        }
    );
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        serde_json::json!({"id": "rec-1", "fileName": "covers/rec-1.jpg"})
    );

    let stored = store.object("covers/rec-1.jpg").unwrap();
    assert_eq!(stored.data, b"JFIF-body".to_vec());
    assert_eq!(stored.metadata.content_type, "image/jpeg");
    assert_eq!(stored.metadata.cache_control.as_deref(), Some("public, max-age=60"));
    assert!(stored.metadata.public_read);
    assert!(!stored.metadata.resumable);
}

#[tokio::test]
async fn test_failed_download_stream_names_the_media_id() {
    let fetcher = fetcher_returning("image/jpeg", || {
        body_of(&["partial"], Some("X"))
    });
    let store = MemoryObjectStore::new();

    let err = fetch_and_upload_file(
        &fetcher,
        &store,
        "rec-2",
        Some("https://i.discogs.com/rec-2.jpg"),
        "covers/rec-2.jpg",
        None,
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "Failed to download media for rec-2: X");
    assert!(store.object("covers/rec-2.jpg").is_none());
}

#[tokio::test]
async fn test_fetch_error_is_a_download_failure() {
    let mut fetcher = MockMediaFetcher::new();
    fetcher.expect_fetch().returning(|_url| {
        Err(ProviderError::Status {
            provider: "media",
            status: 404,
        })
    });
    let store = MockObjectStore::new();

    let err = fetch_and_upload_file(
        &fetcher,
        &store,
        "rec-3",
        Some("https://example.com/missing.jpg"),
        "covers/rec-3.jpg",
        None,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, MediaError::DownloadFailed { ref id, .. } if id == "rec-3"));
}

#[tokio::test]
async fn test_rejected_upload_is_an_upload_failure() {
    let fetcher = fetcher_returning("image/png", || body_of(&["png"], None));
    let mut store = MockObjectStore::new();
    store
        .expect_upload()
        .times(1)
        .returning(|path, _body, _metadata| {
            Err(StoreError::Upload {
                path: path.to_string(),
                message: "quota exceeded".to_string(),
            })
        });

    let err = fetch_and_upload_file(
        &fetcher,
        &store,
        "rec-4",
        Some("https://example.com/rec-4.png"),
        "covers/rec-4.png",
        None,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, MediaError::UploadFailed { .. }));
    assert!(err
        .to_string()
        .starts_with("Failed to upload media to covers/rec-4.png"));
}

#[tokio::test]
async fn test_missing_source_url_never_touches_the_network() {
    let mut fetcher = MockMediaFetcher::new();
    fetcher.expect_fetch().never();
    let store = MockObjectStore::new();

    for url in [None, Some(""), Some("   ")] {
        let err = fetch_and_upload_file(&fetcher, &store, "rec-5", url, "covers/rec-5.jpg", None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No media URL provided for rec-5");
    }
}

#[tokio::test]
async fn test_listing_preserves_provider_order() {
    let empty = MemoryObjectStore::new();
    assert!(list_stored_media(&empty).await.unwrap().is_empty());

    let store = MemoryObjectStore::with_names(["a", "b"]);
    assert_eq!(
        list_stored_media(&store).await.unwrap(),
        vec!["a".to_string(), "b".to_string()]
    );

    store
        .upload("c", body_of(&["c"], None), Default::default())
        .await
        .unwrap();
    assert_eq!(list_stored_media(&store).await.unwrap(), vec!["a", "b", "c"]);
}
