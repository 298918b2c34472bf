//! Storage plane: per-node blob placement, replication coordination and
//! object descriptors.

pub mod manager;
pub mod metadata_store;
pub mod node_store;

pub use manager::Manager;
pub use metadata_store::{MetadataStore, ObjectMeta};
pub use node_store::{compute_object_id, validate_object_id, verify_object_id, NodeStore};
