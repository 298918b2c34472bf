use crate::error::{CofferError, Result};
use crate::storage::manager::Manager;
use crate::storage::metadata_store::{MetadataStore, ObjectMeta};
use crate::storage::node_store::validate_object_id;
use bytes::Bytes;
use std::sync::Arc;

/// Read an object's bytes from the first surviving replica. The
/// descriptor rides along when present so callers can set a content type.
#[derive(Clone)]
pub struct ReadObjectOperation {
    manager: Arc<Manager>,
    metadata: Arc<MetadataStore>,
}

#[derive(Debug, Clone)]
pub struct ReadObjectResult {
    pub body: Bytes,
    pub meta: Option<ObjectMeta>,
}

#[derive(Debug, Clone)]
pub enum ReadObjectOutcome {
    Found(ReadObjectResult),
    NotFound,
}

impl ReadObjectOperation {
    pub fn new(manager: Arc<Manager>, metadata: Arc<MetadataStore>) -> Self {
        Self { manager, metadata }
    }

    pub async fn run(&self, object_id: &str) -> Result<ReadObjectOutcome> {
        validate_object_id(object_id)?;
        match self.manager.retrieve_object(object_id).await {
            Ok(body) => {
                let meta = self.metadata.get(object_id).await.ok();
                Ok(ReadObjectOutcome::Found(ReadObjectResult { body, meta }))
            }
            Err(CofferError::ObjectNotFound(_)) => Ok(ReadObjectOutcome::NotFound),
            Err(error) => Err(error),
        }
    }
}
