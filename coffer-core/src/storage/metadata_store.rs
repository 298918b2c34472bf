use crate::error::{CofferError, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Descriptor persisted for every stored object. `created_at` is set on
/// the first successful upload and survives repairs; only `replicas` is
/// rewritten afterwards, by the self-healer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub id: String,
    pub size: u64,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
    pub replicas: Vec<String>,
}

/// One JSON file per object, `<base>/<id>.json`. Writes go through a temp
/// file and an atomic rename so a concurrent reader observes either the
/// old descriptor or the new one, never a torn file. Saves for the same
/// object are serialized through a per-id mutex.
pub struct MetadataStore {
    base_path: PathBuf,
    save_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl MetadataStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            save_locks: Mutex::new(HashMap::new()),
        })
    }

    pub async fn save(&self, meta: &ObjectMeta) -> Result<()> {
        let lock = self.save_lock(&meta.id);
        let _guard = lock.lock().await;

        let path = self.meta_path(&meta.id);
        let payload = serde_json::to_vec_pretty(meta)?;

        let temp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&payload).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, &path).await?;

        tracing::debug!("saved metadata for object {}", meta.id);
        Ok(())
    }

    pub async fn get(&self, object_id: &str) -> Result<ObjectMeta> {
        let path = self.meta_path(object_id);
        match fs::read(&path).await {
            Ok(payload) => Ok(serde_json::from_slice(&payload)?),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Err(CofferError::MetadataNotFound(object_id.to_string()))
            }
            Err(error) => Err(error.into()),
        }
    }

    pub fn exists(&self, object_id: &str) -> bool {
        self.meta_path(object_id).exists()
    }

    fn meta_path(&self, object_id: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", object_id))
    }

    fn save_lock(&self, object_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.save_locks.lock();
        locks.entry(object_id.to_string()).or_default().clone()
    }
}
