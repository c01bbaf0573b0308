//! In-memory metadata store.
//!
//! Each table is a map behind its own mutex. Used by tests and small
//! ephemeral deployments; the write policy is identical to the file-backed
//! store.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{NarMeta, PathInfo};
use crate::store::{nar_meta_upsert, path_info_upsert, MetadataStore, Upsert};
use async_trait::async_trait;
use decant_core::{NarHash, OutputHash};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Metadata store keeping both tables in memory.
#[derive(Default)]
pub struct MemoryMetadataStore {
    path_infos: Mutex<HashMap<OutputHash, PathInfo>>,
    nar_metas: Mutex<HashMap<NarHash, NarMeta>>,
}

impl MemoryMetadataStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn get_path_info(&self, output_hash: &OutputHash) -> MetadataResult<PathInfo> {
        self.path_infos
            .lock()
            .await
            .get(output_hash)
            .cloned()
            .ok_or_else(|| MetadataError::NotFound(format!("PathInfo {output_hash}")))
    }

    async fn put_path_info(&self, path_info: &PathInfo) -> MetadataResult<()> {
        path_info.check()?;

        if !self
            .nar_metas
            .lock()
            .await
            .contains_key(&path_info.nar_hash)
        {
            return Err(MetadataError::NotFound(format!(
                "PathInfo {} refers to unknown NarMeta {}",
                path_info.output_hash, path_info.nar_hash
            )));
        }

        let mut path_infos = self.path_infos.lock().await;
        match path_info_upsert(path_infos.get(&path_info.output_hash), path_info)? {
            Upsert::Noop => Ok(()),
            Upsert::Write => {
                path_infos.insert(path_info.output_hash, path_info.clone());
                Ok(())
            }
        }
    }

    async fn get_nar_meta(&self, nar_hash: &NarHash) -> MetadataResult<NarMeta> {
        self.nar_metas
            .lock()
            .await
            .get(nar_hash)
            .cloned()
            .ok_or_else(|| MetadataError::NotFound(format!("NarMeta {nar_hash}")))
    }

    async fn put_nar_meta(&self, nar_meta: &NarMeta) -> MetadataResult<()> {
        nar_meta.check()?;

        {
            let path_infos = self.path_infos.lock().await;
            for (i, reference) in nar_meta.references.iter().enumerate() {
                if !path_infos.contains_key(reference) {
                    return Err(MetadataError::NotFound(format!(
                        "NarMeta {} refers to unknown store path {}",
                        nar_meta.nar_hash, nar_meta.references_str[i]
                    )));
                }
            }
        }

        let mut nar_metas = self.nar_metas.lock().await;
        match nar_meta_upsert(nar_metas.get(&nar_meta.nar_hash), nar_meta)? {
            Upsert::Noop => Ok(()),
            Upsert::Write => {
                nar_metas.insert(nar_meta.nar_hash, nar_meta.clone());
                Ok(())
            }
        }
    }

    async fn drop_all(&self) -> MetadataResult<()> {
        self.path_infos.lock().await.clear();
        self.nar_metas.lock().await.clear();
        Ok(())
    }
}
