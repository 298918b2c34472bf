use crate::error::Result;
use crate::storage::manager::Manager;
use crate::storage::metadata_store::{MetadataStore, ObjectMeta};
use std::collections::HashSet;
use std::sync::Arc;

/// Raises the observed replica count of an object back toward the
/// replication factor by copying from a surviving replica onto the ring
/// targets that lost theirs, then persists the re-observed replica list.
pub struct SelfHealer {
    manager: Arc<Manager>,
    metadata: Arc<MetadataStore>,
    replication: usize,
}

impl SelfHealer {
    pub fn new(manager: Arc<Manager>, metadata: Arc<MetadataStore>, replication: usize) -> Self {
        Self {
            manager,
            metadata,
            replication: replication.max(1),
        }
    }

    /// Run one heal cycle for the object described by `meta`. Best-effort:
    /// a target that fails to accept the copy is logged and skipped, and
    /// the cycle moves on to the next missing target.
    pub async fn ensure_replication(&self, mut meta: ObjectMeta) -> Result<()> {
        let object_id = meta.id.clone();
        let observed = self.manager.check_replicas(&object_id).await;
        if observed.len() >= self.replication {
            return Ok(());
        }

        tracing::info!(
            "object {} has {} of {} replicas, healing",
            object_id,
            observed.len(),
            self.replication
        );

        let observed_set: HashSet<&str> = observed.iter().map(String::as_str).collect();
        let mut repaired = 0usize;
        for target in self.manager.target_nodes(&object_id) {
            if observed_set.contains(target.as_str()) {
                continue;
            }
            if let Err(error) = self.manager.replicate_object(&object_id, &target).await {
                tracing::warn!(
                    "failed to replicate object {} to node {}: {}",
                    object_id,
                    target,
                    error
                );
                continue;
            }
            repaired += 1;
            if observed.len() + repaired >= self.replication {
                break;
            }
        }

        if repaired > 0 {
            meta.replicas = self.manager.check_replicas(&object_id).await;
            self.metadata.save(&meta).await?;
            tracing::info!(
                "object {} healed to {} replicas",
                object_id,
                meta.replicas.len()
            );
        }
        Ok(())
    }

    /// Fire-and-forget heal on a detached task. Errors are logged, never
    /// surfaced to the request that triggered the heal.
    pub fn spawn(self: &Arc<Self>, meta: ObjectMeta) {
        let healer = Arc::clone(self);
        tokio::spawn(async move {
            let object_id = meta.id.clone();
            if let Err(error) = healer.ensure_replication(meta).await {
                tracing::warn!("self-heal for object {} failed: {}", object_id, error);
            }
        });
    }
}
