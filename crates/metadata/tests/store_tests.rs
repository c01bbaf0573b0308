//! Metadata store behavior, exercised against both backends.

use decant_core::{ContentHash, NarHash, OutputHash, Signature};
use decant_metadata::{
    FileMetadataStore, MemoryMetadataStore, MetadataStore, NarMeta, PathInfo,
};
use std::sync::Arc;

fn nar_hash(seed: u8) -> NarHash {
    NarHash::from_content_hash(ContentHash::compute(&[seed; 16]))
}

fn nar_meta(seed: u8) -> NarMeta {
    NarMeta {
        nar_hash: nar_hash(seed),
        size: 1000 + seed as u64,
        references: Vec::new(),
        references_str: Vec::new(),
    }
}

fn path_info(seed: u8, nar: &NarMeta) -> PathInfo {
    PathInfo {
        output_hash: OutputHash::from_bytes([seed; 20]),
        name: format!("pkg-{seed}"),
        nar_hash: nar.nar_hash,
        deriver: String::new(),
        system: "x86_64-linux".to_string(),
        signatures: vec![Signature::new("cache.example.org-1", "c2ln")],
        ca: String::new(),
    }
}

fn with_reference(mut nm: NarMeta, target: &PathInfo) -> NarMeta {
    nm.references.push(target.output_hash);
    nm.references_str
        .push(format!("{}-{}", target.output_hash.to_base32(), target.name));
    nm
}

async fn backends() -> Vec<(Option<tempfile::TempDir>, Arc<dyn MetadataStore>)> {
    let dir = tempfile::tempdir().unwrap();
    let file: Arc<dyn MetadataStore> =
        Arc::new(FileMetadataStore::new(dir.path()).await.unwrap());
    let memory: Arc<dyn MetadataStore> = Arc::new(MemoryMetadataStore::new());
    vec![(Some(dir), file), (None, memory)]
}

#[tokio::test]
async fn test_nar_meta_roundtrip() {
    for (_dir, store) in backends().await {
        let nm = nar_meta(1);
        assert!(store.get_nar_meta(&nm.nar_hash).await.unwrap_err().is_not_found());

        store.put_nar_meta(&nm).await.unwrap();
        assert_eq!(store.get_nar_meta(&nm.nar_hash).await.unwrap(), nm);

        // equal re-put is a no-op
        store.put_nar_meta(&nm).await.unwrap();
    }
}

#[tokio::test]
async fn test_path_info_requires_nar_meta() {
    for (_dir, store) in backends().await {
        let nm = nar_meta(1);
        let pi = path_info(10, &nm);

        let err = store.put_path_info(&pi).await.unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {err:?}");

        store.put_nar_meta(&nm).await.unwrap();
        store.put_path_info(&pi).await.unwrap();
        assert_eq!(store.get_path_info(&pi.output_hash).await.unwrap(), pi);
    }
}

#[tokio::test]
async fn test_nar_meta_requires_referenced_path_infos() {
    for (_dir, store) in backends().await {
        let dep_nar = nar_meta(1);
        let dep = path_info(10, &dep_nar);
        let nm = with_reference(nar_meta(2), &dep);

        let err = store.put_nar_meta(&nm).await.unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {err:?}");

        store.put_nar_meta(&dep_nar).await.unwrap();
        store.put_path_info(&dep).await.unwrap();
        store.put_nar_meta(&nm).await.unwrap();
    }
}

#[tokio::test]
async fn test_reference_backfill_is_allowed_once() {
    for (_dir, store) in backends().await {
        let dep_nar = nar_meta(1);
        let dep = path_info(10, &dep_nar);
        store.put_nar_meta(&dep_nar).await.unwrap();
        store.put_path_info(&dep).await.unwrap();

        // skeleton NarMeta from the NAR upload, no references yet
        let skeleton = nar_meta(2);
        store.put_nar_meta(&skeleton).await.unwrap();

        // first narinfo completes it
        let completed = with_reference(skeleton.clone(), &dep);
        store.put_nar_meta(&completed).await.unwrap();
        assert_eq!(
            store.get_nar_meta(&skeleton.nar_hash).await.unwrap(),
            completed
        );

        // a different reference set afterwards is a conflict
        let other_dep_nar = nar_meta(3);
        let other_dep = path_info(11, &other_dep_nar);
        store.put_nar_meta(&other_dep_nar).await.unwrap();
        store.put_path_info(&other_dep).await.unwrap();

        let conflicting = with_reference(skeleton.clone(), &other_dep);
        assert!(store.put_nar_meta(&conflicting).await.is_err());
    }
}

#[tokio::test]
async fn test_unequal_rewrite_is_a_conflict() {
    for (_dir, store) in backends().await {
        let nm = nar_meta(1);
        store.put_nar_meta(&nm).await.unwrap();

        let mut resized = nm.clone();
        resized.size += 1;
        assert!(store.put_nar_meta(&resized).await.is_err());

        let pi = path_info(10, &nm);
        store.put_path_info(&pi).await.unwrap();
        store.put_path_info(&pi).await.unwrap();

        let mut changed = pi.clone();
        changed.system = "aarch64-linux".to_string();
        assert!(store.put_path_info(&changed).await.is_err());
    }
}

#[tokio::test]
async fn test_put_rejects_invalid_entities() {
    for (_dir, store) in backends().await {
        let mut nm = nar_meta(1);
        nm.size = 0;
        assert!(store.put_nar_meta(&nm).await.is_err());

        let nm = nar_meta(1);
        store.put_nar_meta(&nm).await.unwrap();
        let mut pi = path_info(10, &nm);
        pi.deriver = "short.drv".to_string();
        assert!(store.put_path_info(&pi).await.is_err());
    }
}

#[tokio::test]
async fn test_drop_all() {
    for (_dir, store) in backends().await {
        let nm = nar_meta(1);
        let pi = path_info(10, &nm);
        store.put_nar_meta(&nm).await.unwrap();
        store.put_path_info(&pi).await.unwrap();

        store.drop_all().await.unwrap();
        assert!(store.get_nar_meta(&nm.nar_hash).await.unwrap_err().is_not_found());
        assert!(store
            .get_path_info(&pi.output_hash)
            .await
            .unwrap_err()
            .is_not_found());

        // the store stays usable
        store.put_nar_meta(&nm).await.unwrap();
    }
}

#[tokio::test]
async fn test_file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let nm = nar_meta(1);
    let pi = path_info(10, &nm);

    {
        let store = FileMetadataStore::new(dir.path()).await.unwrap();
        store.put_nar_meta(&nm).await.unwrap();
        store.put_path_info(&pi).await.unwrap();
    }

    let reopened = FileMetadataStore::new(dir.path()).await.unwrap();
    assert_eq!(reopened.get_nar_meta(&nm.nar_hash).await.unwrap(), nm);
    assert_eq!(reopened.get_path_info(&pi.output_hash).await.unwrap(), pi);
}
