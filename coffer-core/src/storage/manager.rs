use crate::error::{CofferError, Result};
use crate::ring::HashRing;
use crate::storage::node_store::{validate_object_id, NodeStore};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Composes the hash ring and the registered node stores into a single
/// object service: writes fan out to every ring target, reads fall back
/// across surviving replicas, and the repair primitive copies blobs onto
/// nodes the self-healer designates.
pub struct Manager {
    nodes: RwLock<HashMap<String, Arc<NodeStore>>>,
    ring: Arc<HashRing>,
    replication: usize,
}

impl Manager {
    pub fn new(ring: Arc<HashRing>, replication: usize) -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            ring,
            replication: replication.max(1),
        }
    }

    pub fn replication(&self) -> usize {
        self.replication
    }

    pub fn add_node(&self, store: Arc<NodeStore>) {
        self.nodes.write().insert(store.id().to_string(), store);
    }

    fn node(&self, node_id: &str) -> Option<Arc<NodeStore>> {
        self.nodes.read().get(node_id).cloned()
    }

    /// Snapshot of every registered store, sorted by node id. Taken before
    /// any await so the map lock is never held across I/O.
    fn node_snapshot(&self) -> Vec<Arc<NodeStore>> {
        let mut stores: Vec<_> = self.nodes.read().values().cloned().collect();
        stores.sort_by(|a, b| a.id().cmp(b.id()));
        stores
    }

    /// Write the object to every ring target, in ring order. Returns the
    /// node ids that accepted the write. Partial success is success: as
    /// long as one replica landed the call succeeds and the caller is
    /// expected to trigger a heal for the rest. Only when every target
    /// fails is the last underlying error surfaced.
    pub async fn store_object(&self, object_id: &str, data: Bytes) -> Result<Vec<String>> {
        validate_object_id(object_id)?;
        let targets = self.ring.get_nodes(object_id, self.replication);
        if targets.is_empty() {
            return Err(CofferError::NoNodes);
        }

        let mut replicated = Vec::with_capacity(targets.len());
        let mut last_error = None;
        for node_id in &targets {
            let Some(store) = self.node(node_id) else {
                tracing::warn!("ring target {} is not registered with the manager", node_id);
                continue;
            };
            match store.store(object_id, data.clone()).await {
                Ok(()) => {
                    tracing::info!("stored object {} on node {}", object_id, node_id);
                    replicated.push(node_id.clone());
                }
                Err(error) => {
                    tracing::error!(
                        "failed to store object {} on node {}: {}",
                        object_id,
                        node_id,
                        error
                    );
                    last_error = Some(error);
                }
            }
        }

        if replicated.is_empty() {
            return Err(last_error.unwrap_or(CofferError::NoNodes));
        }
        Ok(replicated)
    }

    /// Read the object from the first ring target that still holds it.
    pub async fn retrieve_object(&self, object_id: &str) -> Result<Bytes> {
        validate_object_id(object_id)?;
        let targets = self.ring.get_nodes(object_id, self.replication);
        for node_id in &targets {
            let Some(store) = self.node(node_id) else {
                continue;
            };
            if !store.exists(object_id).await {
                continue;
            }
            match store.retrieve(object_id).await {
                Ok(data) => {
                    tracing::debug!("retrieved object {} from node {}", object_id, node_id);
                    return Ok(data);
                }
                Err(error) => {
                    tracing::warn!(
                        "failed to read object {} from node {}: {}",
                        object_id,
                        node_id,
                        error
                    );
                }
            }
        }
        Err(CofferError::ObjectNotFound(object_id.to_string()))
    }

    /// Copy the object onto a specific node, reading from any surviving
    /// replica. The target comes from the caller, not the ring; the
    /// self-healer has already decided where the copy belongs.
    pub async fn replicate_object(&self, object_id: &str, target_node_id: &str) -> Result<()> {
        let data = self.retrieve_object(object_id).await?;
        let store = self.node(target_node_id).ok_or_else(|| {
            CofferError::InvalidRequest(format!("target node not registered: {}", target_node_id))
        })?;
        store.store(object_id, data).await?;
        tracing::info!("replicated object {} to node {}", object_id, target_node_id);
        Ok(())
    }

    /// Probe every registered node for the object, not just the ring
    /// targets. The survivors, sorted by node id, are the authoritative
    /// observation of the replica set.
    pub async fn check_replicas(&self, object_id: &str) -> Vec<String> {
        let mut survivors = Vec::new();
        for store in self.node_snapshot() {
            if store.exists(object_id).await {
                survivors.push(store.id().to_string());
            }
        }
        survivors
    }

    /// The nodes the ring designates for this object.
    pub fn target_nodes(&self, object_id: &str) -> Vec<String> {
        self.ring.get_nodes(object_id, self.replication)
    }
}
