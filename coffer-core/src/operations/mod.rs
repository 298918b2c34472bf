//! Object-level operations composing the ring, node stores, metadata and
//! the self-healer. The HTTP layer is thin glue over these.

pub mod object_status;
pub mod put_object;
pub mod read_object;

pub use object_status::{ObjectStatusOperation, ObjectStatusOutcome};
pub use put_object::{
    PutObjectOperation, PutObjectOutcome, PutObjectRequest, DEFAULT_CONTENT_TYPE,
};
pub use read_object::{ReadObjectOperation, ReadObjectOutcome, ReadObjectResult};
