//! Remote models.
//!
//! These types represent what the source listing and the destination task
//! service hand back, and what gets sent to the destination when creating
//! tasks. They are deliberately transport-agnostic.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::str::FromStr;

/// Metadata key carrying the back-reference from a destination task to the
/// source item it was created from.
pub const SOURCE_ITEM_ID_KEY: &str = "source_item_id";

/// Free-form key/value metadata embedded in a destination task.
pub type Metadata = Map<String, Value>;

/// Processing status of a source item.
///
/// Only items in the configured eligible status (normally
/// [`Completed`](Self::Completed)) are synchronized; anything still being
/// processed upstream is left for a later pass.
#[derive(Clone, Debug, Default, Display, PartialEq, Eq, Hash)]
pub enum ItemStatus {
    #[default]
    #[display("COMPLETED")]
    Completed,
    #[display("PROCESSING")]
    Processing,
    #[display("FAILED")]
    Failed,
    /// Any status this crate has no name for, kept verbatim.
    #[display("{_0}")]
    Other(String),
}
impl FromStr for ItemStatus {
    type Err = Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_uppercase().as_str() {
            "COMPLETED" => Self::Completed,
            "PROCESSING" => Self::Processing,
            "FAILED" => Self::Failed,
            _ => Self::Other(s.trim().to_string()),
        })
    }
}

/// A file belonging to a source dataset, as observed through the listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceItem {
    /// Stable identifier, unique within the dataset.
    pub id: String,
    /// Extension or mime-like type string, e.g. `"jpg"` or `"audio/mpeg"`.
    pub type_descriptor: String,
    /// Path or URI of the file in source-side storage.
    pub storage_locator: String,
    /// File size in bytes.
    pub size: u64,
    /// Original (user-facing) file name.
    pub display_name: String,
    pub status: ItemStatus,
}

/// One page of a source dataset listing, exactly as the provider returned it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilePage {
    pub items: Vec<SourceItem>,
    /// Zero-based page index.
    pub page: u64,
    /// Requested page size.
    pub size: u64,
    /// Number of pages the source *declares* for the whole listing.
    pub total_pages: u64,
    pub total_elements: u64,
}

/// Descriptive information about a source dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetInfo {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Dataset type code as used by the source (e.g. `"IMAGE_CLASSIFICATION"`).
    pub kind_code: Option<String>,
    /// Declared number of files in the dataset, regardless of status.
    pub file_count: u64,
}

/// Media category of a task payload; also the key of its primary data field.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    #[default]
    #[display("image")]
    Image,
    #[display("audio")]
    Audio,
    #[display("video")]
    Video,
    #[display("text")]
    Text,
}
impl MediaCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Text => "text",
        }
    }
}

/// An existing task in a destination project.
#[derive(Clone, Debug, PartialEq)]
pub struct DestinationTask {
    /// Identifier assigned by the destination.
    pub id: u64,
    pub metadata: Metadata,
}
impl DestinationTask {
    /// The source item this task was created from, if it carries a
    /// back-reference at all.
    pub fn source_item_id(&self) -> Option<String> {
        source_item_id(&self.metadata)
    }
}

/// A task to be created in a destination project.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TaskPayload {
    /// Task data; the primary field is keyed by [`MediaCategory`].
    pub data: Metadata,
    pub meta: Metadata,
}
impl TaskPayload {
    pub fn source_item_id(&self) -> Option<String> {
        source_item_id(&self.meta)
    }
}

// Destinations are not consistent about whether identifiers come back as
// strings or numbers; empty strings count as absent.
fn source_item_id(metadata: &Metadata) -> Option<String> {
    match metadata.get(SOURCE_ITEM_ID_KEY)? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// A project created in the destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectInfo {
    pub id: String,
    pub title: String,
}

/// Tally of a best-effort batch deletion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub successful: u64,
    pub failed: u64,
    pub total: u64,
}
impl DeleteOutcome {
    /// Records the result of deleting a single task.
    pub fn record(&mut self, deleted: bool) {
        self.total += 1;
        if deleted {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
    }
}
