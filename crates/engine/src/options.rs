use labelsync_remote::models::ItemStatus;

pub const DEFAULT_BATCH_SIZE: u64 = 50;
/// Destination listings are paged as coarsely as the destination allows, to
/// keep index building to a few round-trips.
pub const DEFAULT_TASK_PAGE_SIZE: u64 = 1000;
pub const DEFAULT_SOURCE_PREFIX: &str = "/dataset";
pub const DEFAULT_DESTINATION_PREFIX: &str = "/data/local-files/?d=dataset";

/// Tunables for a reconciliation pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Source page size; also the size of each batch creation.
    pub batch_size: u64,
    /// Page size requested when enumerating destination tasks.
    pub task_page_size: u64,
    /// Only source items in this status are synchronized.
    pub eligible_status: ItemStatus,
    pub path_rewrite: PathRewrite,
}
impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            task_page_size: DEFAULT_TASK_PAGE_SIZE,
            eligible_status: ItemStatus::Completed,
            path_rewrite: PathRewrite::default(),
        }
    }
}

/// Rewrites source-side storage locators into destination-side serving
/// locators by swapping a leading prefix.
///
/// ```
/// use labelsync_engine::PathRewrite;
///
/// let rewrite = PathRewrite::new("/dataset", "/data/local-files/?d=dataset");
/// assert_eq!(rewrite.apply("/dataset/d1/cat.jpg"), "/data/local-files/?d=dataset/d1/cat.jpg");
/// assert_eq!(rewrite.apply("s3://bucket/cat.jpg"), "s3://bucket/cat.jpg");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathRewrite {
    source_prefix: String,
    destination_prefix: String,
}
impl Default for PathRewrite {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_PREFIX, DEFAULT_DESTINATION_PREFIX)
    }
}
impl PathRewrite {
    pub fn new(source_prefix: impl Into<String>, destination_prefix: impl Into<String>) -> Self {
        Self {
            source_prefix: source_prefix.into(),
            destination_prefix: destination_prefix.into(),
        }
    }

    /// A rewrite that leaves every locator untouched.
    pub fn identity() -> Self {
        Self::new("", "")
    }

    pub fn source_prefix(&self) -> &str {
        &self.source_prefix
    }

    pub fn destination_prefix(&self) -> &str {
        &self.destination_prefix
    }

    /// Locators outside the source prefix are passed through unchanged, as
    /// is everything when the source prefix is empty.
    pub fn apply(&self, locator: &str) -> String {
        if self.source_prefix.is_empty() {
            return locator.to_string();
        }
        match locator.strip_prefix(&self.source_prefix) {
            Some(rest) => format!("{}{rest}", self.destination_prefix),
            None => locator.to_string(),
        }
    }
}
