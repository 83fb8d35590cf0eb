//! Keeps an annotation project's tasks in line with the source dataset it
//! was provisioned for.
//!
//! A reconciliation pass is built from small pieces that can each be used on
//! their own:
//!
//! 1. [`build_index()`] maps source item IDs to the tasks already created
//!    for them;
//! 2. [`scan()`] lists the dataset's eligible items one page at a time;
//! 3. [`diff()`] splits each page into items that need a task and items
//!    that have one;
//! 4. [`mutate`] creates the missing tasks and removes the stale ones.
//!
//! [`Reconciler`] runs them in order for a stored mapping and reports a
//! [`ReconciliationSummary`]. [`lifecycle`] creates and retires the mappings
//! themselves.

mod classify;
mod diff;
pub mod error;
mod index;
pub mod lifecycle;
pub mod mutate;
pub mod options;
mod reconcile;
mod scan;

pub use crate::classify::{classify, classify_dataset_kind};
pub use crate::diff::{Diff, diff};
pub use crate::index::{CorrelationIndex, IndexResult, build_index};
pub use crate::options::{PathRewrite, ReconcileOptions};
pub use crate::reconcile::{ReconciliationSummary, Reconciler, SummaryStatus, SyncStatus};
pub use crate::scan::{PageFilter, SourcePage, scan};
