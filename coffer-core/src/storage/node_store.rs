use crate::error::{CofferError, Result};
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

/// A single storage node: one directory tree on the local filesystem.
///
/// Blobs are sharded two levels deep by object id prefix,
/// `<base>/<id[0..2]>/<id[2..4]>/<id>`, which keeps per-directory entry
/// counts bounded. Writes and deletes take the node's exclusive lock;
/// reads and stats share it.
pub struct NodeStore {
    id: String,
    base_path: PathBuf,
    lock: RwLock<()>,
}

impl NodeStore {
    pub fn new(id: impl Into<String>, base_path: impl Into<PathBuf>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(CofferError::InvalidRequest(
                "node id cannot be empty".to_string(),
            ));
        }
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self {
            id,
            base_path,
            lock: RwLock::new(()),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Persist a blob under its object id. The bytes land in a temp file
    /// first and are renamed into place, so a failed write never leaves a
    /// partial blob visible under the final path.
    pub async fn store(&self, object_id: &str, data: Bytes) -> Result<()> {
        validate_object_id(object_id)?;
        let shard_dir = self.shard_dir(object_id);
        let object_path = shard_dir.join(object_id);

        let _guard = self.lock.write().await;
        fs::create_dir_all(&shard_dir).await?;

        let temp_path = object_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        if let Err(error) = write_and_sync(&mut file, &data).await {
            drop(file);
            let _ = fs::remove_file(&temp_path).await;
            return Err(error);
        }
        drop(file);
        fs::rename(&temp_path, &object_path).await?;

        tracing::debug!("stored object {} on node {}", object_id, self.id);
        Ok(())
    }

    pub async fn retrieve(&self, object_id: &str) -> Result<Bytes> {
        validate_object_id(object_id)?;
        let object_path = self.object_path(object_id);

        let _guard = self.lock.read().await;
        match fs::read(&object_path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Err(CofferError::ObjectNotFound(object_id.to_string()))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Stat-only presence probe. Malformed ids are simply absent.
    pub async fn exists(&self, object_id: &str) -> bool {
        if validate_object_id(object_id).is_err() {
            return false;
        }
        let object_path = self.object_path(object_id);
        let _guard = self.lock.read().await;
        object_path.exists()
    }

    pub async fn size(&self, object_id: &str) -> Result<u64> {
        validate_object_id(object_id)?;
        let object_path = self.object_path(object_id);

        let _guard = self.lock.read().await;
        match fs::metadata(&object_path).await {
            Ok(info) => Ok(info.len()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Err(CofferError::ObjectNotFound(object_id.to_string()))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Idempotent removal; a missing blob is not an error.
    pub async fn delete(&self, object_id: &str) -> Result<()> {
        validate_object_id(object_id)?;
        let object_path = self.object_path(object_id);

        let _guard = self.lock.write().await;
        match fs::remove_file(&object_path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    fn shard_dir(&self, object_id: &str) -> PathBuf {
        self.base_path
            .join(&object_id[0..2])
            .join(&object_id[2..4])
    }

    fn object_path(&self, object_id: &str) -> PathBuf {
        self.shard_dir(object_id).join(object_id)
    }
}

async fn write_and_sync(file: &mut fs::File, data: &[u8]) -> Result<()> {
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

/// SHA-256 of the object bytes, lowercase hex. The object id is the hash:
/// identical content always maps to the same id.
pub fn compute_object_id(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Object ids are exactly 64 lowercase hex characters.
pub fn validate_object_id(object_id: &str) -> Result<()> {
    let well_formed = object_id.len() == 64
        && object_id
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if well_formed {
        Ok(())
    } else {
        Err(CofferError::InvalidRequest(format!(
            "malformed object id: {}",
            object_id
        )))
    }
}

/// Verify that data matches its content-derived id.
pub fn verify_object_id(data: &[u8], expected: &str) -> Result<()> {
    let actual = compute_object_id(data);
    if actual != expected {
        return Err(CofferError::HashMismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}
