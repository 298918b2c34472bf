//! Coffer Core - content-addressed object storage with local replication
//!
//! A single-host object store that:
//! - derives object ids from the SHA-256 of the content
//! - places replicas on a set of directory-backed storage nodes via a
//!   consistent-hash ring
//! - reads from any surviving replica
//! - heals lost replicas in the background until the observed count
//!   reaches the replication factor

pub mod error;
pub mod healer;
pub mod operations;
pub mod ring;
pub mod storage;

pub use error::{CofferError, Result};
pub use healer::SelfHealer;
pub use operations::{
    ObjectStatusOperation, ObjectStatusOutcome, PutObjectOperation, PutObjectOutcome,
    PutObjectRequest, ReadObjectOperation, ReadObjectOutcome, ReadObjectResult,
    DEFAULT_CONTENT_TYPE,
};
pub use ring::{hash_key, HashRing};
pub use storage::{
    compute_object_id, validate_object_id, verify_object_id, Manager, MetadataStore, NodeStore,
    ObjectMeta,
};
