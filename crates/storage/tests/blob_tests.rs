//! Round-trip and deduplication tests for the blob store.

use decant_core::{ChunkerParams, ContentHash};
use decant_storage::{BlobStore, BlobStream};
use futures::StreamExt;
use std::sync::Arc;

async fn test_store(dir: &tempfile::TempDir) -> BlobStore {
    let params = ChunkerParams::from_avg(4096).unwrap();
    BlobStore::open_local(dir.path(), &params).await.unwrap()
}

fn test_payload(len: usize) -> Vec<u8> {
    let mut state: u64 = 0xdeca_17;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 48) as u8
        })
        .collect()
}

async fn collect(mut stream: BlobStream) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk.unwrap());
    }
    out
}

async fn put_payload(store: &BlobStore, payload: &[u8]) -> decant_storage::BlobSummary {
    let mut writer = store.put_blob().await.unwrap();
    // Write in uneven slices to exercise the streaming path.
    for piece in payload.chunks(1337) {
        writer.write(piece).await.unwrap();
    }
    writer.finish().await.unwrap()
}

#[tokio::test]
async fn test_roundtrip_various_sizes() {
    let dir = tempfile::tempdir().unwrap();
    let store = test_store(&dir).await;

    for len in [0usize, 1, 1000, 4096, 100 * 1024, 1024 * 1024] {
        let payload = test_payload(len);
        let summary = put_payload(&store, &payload).await;

        assert_eq!(summary.hash, ContentHash::compute(&payload));
        assert_eq!(summary.size, len as u64);
        assert!(!summary.deduplicated);

        let (stream, total) = store.get_blob(&summary.hash).await.unwrap();
        assert_eq!(total, len as u64);
        assert_eq!(collect(stream).await, payload, "mismatch at len {len}");
    }
}

#[tokio::test]
async fn test_second_put_is_deduplicated() {
    let dir = tempfile::tempdir().unwrap();
    let store = test_store(&dir).await;
    let payload = test_payload(200 * 1024);

    let first = put_payload(&store, &payload).await;
    assert!(!first.deduplicated);

    let second = put_payload(&store, &payload).await;
    assert!(second.deduplicated);
    assert_eq!(second.hash, first.hash);
    assert_eq!(second.size, first.size);

    let (stream, _) = store.get_blob(&first.hash).await.unwrap();
    assert_eq!(collect(stream).await, payload);
}

#[tokio::test]
async fn test_get_missing_blob_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = test_store(&dir).await;

    let missing = ContentHash::compute(b"was never uploaded");
    let err = match store.get_blob(&missing).await {
        Err(e) => e,
        Ok(_) => panic!("expected error for missing blob"),
    };
    assert!(err.is_not_found(), "unexpected error: {err:?}");
    assert!(!store.has_blob(&missing).await.unwrap());
}

#[tokio::test]
async fn test_concurrent_equal_uploads() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(test_store(&dir).await);
    let payload = Arc::new(test_payload(300 * 1024));

    let mut tasks = Vec::new();
    for _ in 0..6 {
        let store = Arc::clone(&store);
        let payload = Arc::clone(&payload);
        tasks.push(tokio::spawn(async move {
            put_payload(&store, &payload).await
        }));
    }

    let expected = ContentHash::compute(&payload);
    for task in tasks {
        let summary = task.await.unwrap();
        assert_eq!(summary.hash, expected);
        assert_eq!(summary.size, payload.len() as u64);
    }

    assert!(store.has_blob(&expected).await.unwrap());
    let (stream, total) = store.get_blob(&expected).await.unwrap();
    assert_eq!(total, payload.len() as u64);
    assert_eq!(collect(stream).await, *payload);
}

#[tokio::test]
async fn test_in_memory_store_roundtrip() {
    let params = ChunkerParams::from_avg(4096).unwrap();
    let store = BlobStore::in_memory(&params);
    let payload = test_payload(64 * 1024);

    let summary = put_payload(&store, &payload).await;
    assert_eq!(summary.hash, ContentHash::compute(&payload));

    let (stream, total) = store.get_blob(&summary.hash).await.unwrap();
    assert_eq!(total, payload.len() as u64);
    assert_eq!(collect(stream).await, payload);
}

#[tokio::test]
async fn test_shared_content_shares_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let store = test_store(&dir).await;

    // Two payloads with a large common middle; both must round-trip
    // regardless of how much the chunker manages to share.
    let common = test_payload(256 * 1024);
    let mut a = b"prefix-a".to_vec();
    a.extend_from_slice(&common);
    let mut b = b"another-prefix".to_vec();
    b.extend_from_slice(&common);

    let sa = put_payload(&store, &a).await;
    let sb = put_payload(&store, &b).await;
    assert_ne!(sa.hash, sb.hash);

    let (stream_a, _) = store.get_blob(&sa.hash).await.unwrap();
    let (stream_b, _) = store.get_blob(&sb.hash).await.unwrap();
    assert_eq!(collect(stream_a).await, a);
    assert_eq!(collect(stream_b).await, b);
}
