use crate::error::{CofferError, Result};
use crate::healer::SelfHealer;
use crate::storage::manager::Manager;
use crate::storage::metadata_store::{MetadataStore, ObjectMeta};
use crate::storage::node_store::validate_object_id;
use std::sync::Arc;

/// Metadata fetch with a live replica observation. The stored replica
/// list is replaced by what `check_replicas` sees right now; when the
/// observation falls short of the replication factor a background heal
/// is kicked off.
#[derive(Clone)]
pub struct ObjectStatusOperation {
    manager: Arc<Manager>,
    metadata: Arc<MetadataStore>,
    healer: Arc<SelfHealer>,
}

#[derive(Debug, Clone)]
pub enum ObjectStatusOutcome {
    Found(ObjectMeta),
    NotFound,
}

impl ObjectStatusOperation {
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

    pub async fn run(&self, object_id: &str) -> Result<ObjectStatusOutcome> {
        validate_object_id(object_id)?;
        let mut meta = match self.metadata.get(object_id).await {
            Ok(meta) => meta,
            Err(CofferError::MetadataNotFound(_)) => return Ok(ObjectStatusOutcome::NotFound),
            Err(error) => return Err(error),
        };

        meta.replicas = self.manager.check_replicas(object_id).await;
        if meta.replicas.len() < self.manager.replication() {
            self.healer.spawn(meta.clone());
        }

        Ok(ObjectStatusOutcome::Found(meta))
    }
}
