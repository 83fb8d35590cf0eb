//! Task creation and deletion against the destination.
//!
//! Neither path ever fails a pass: partial failures only reduce the counts
//! that are reported back.

mod create;
mod delete;

pub use self::create::{CreateOutcome, create_batch, task_payload};
pub use self::delete::{delete_batch, deletion_candidates};

/// Metadata keys written into every created task, next to
/// [`SOURCE_ITEM_ID_KEY`](labelsync_remote::models::SOURCE_ITEM_ID_KEY).
pub mod meta_keys {
    pub const ORIGINAL_NAME: &str = "original_name";
    pub const FILE_SIZE: &str = "file_size";
    pub const FILE_TYPE: &str = "file_type";
    pub const SOURCE_DATASET_ID: &str = "source_dataset_id";
}
