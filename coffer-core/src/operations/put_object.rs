use crate::error::Result;
use crate::healer::SelfHealer;
use crate::storage::manager::Manager;
use crate::storage::metadata_store::{MetadataStore, ObjectMeta};
use crate::storage::node_store::compute_object_id;
use bytes::Bytes;
use std::sync::Arc;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Content-addressed upload: hash the payload, fan the bytes out to the
/// ring targets, persist the descriptor. Re-uploading identical bytes
/// returns the original descriptor untouched.
#[derive(Clone)]
pub struct PutObjectOperation {
    manager: Arc<Manager>,
    metadata: Arc<MetadataStore>,
    healer: Arc<SelfHealer>,
}

#[derive(Debug, Clone)]
pub struct PutObjectRequest {
    pub data: Bytes,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
pub enum PutObjectOutcome {
    /// First upload of this content.
    Created(ObjectMeta),
    /// The same bytes were uploaded before; `created_at` is preserved.
    AlreadyExists(ObjectMeta),
}

impl PutObjectOperation {
    pub fn new(
        manager: Arc<Manager>,
        metadata: Arc<MetadataStore>,
        healer: Arc<SelfHealer>,
    ) -> Self {
        Self {
            manager,
            metadata,
            healer,
        }
    }

    pub async fn run(&self, request: PutObjectRequest) -> Result<PutObjectOutcome> {
        let PutObjectRequest { data, content_type } = request;
        let object_id = compute_object_id(&data);

        if self.metadata.exists(&object_id) {
            if let Ok(existing) = self.metadata.get(&object_id).await {
                tracing::debug!("object {} already stored", object_id);
                return Ok(PutObjectOutcome::AlreadyExists(existing));
            }
        }

        let size = data.len() as u64;
        let replicas = self.manager.store_object(&object_id, data).await?;

        let meta = ObjectMeta {
            id: object_id.clone(),
            size,
            content_type: content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            created_at: chrono::Utc::now(),
            replicas: replicas.clone(),
        };

        // The object is durable even if the descriptor write fails; log
        // and keep going so the upload still succeeds.
        if let Err(error) = self.metadata.save(&meta).await {
            tracing::error!(
                "failed to save metadata for object {}: {}",
                object_id,
                error
            );
        }

        if replicas.len() < self.manager.replication() {
            self.healer.spawn(meta.clone());
        }

        Ok(PutObjectOutcome::Created(meta))
    }
}
