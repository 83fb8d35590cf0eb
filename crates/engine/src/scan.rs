//! Paginated enumeration of a source dataset's eligible items.

use crate::error::{ErrorKind, Result};
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use labelsync_remote::SourceHandle;
use labelsync_remote::models::{ItemStatus, SourceItem};

/// Which items to fetch, and how many per request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageFilter {
    pub page_size: u64,
    pub eligible_status: ItemStatus,
}

/// One page of eligible source items.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourcePage {
    /// Eligible items, in the order the source listed them.
    pub items: Vec<SourceItem>,
    /// Zero-based page index.
    pub page_index: u64,
    /// Number of pages the source declared when this page was fetched.
    pub total_pages: u64,
    /// Items on the page that were dropped for not being eligible.
    pub ineligible: u64,
}

/// Stream a dataset's eligible items one page at a time.
///
/// Pages are fetched lazily, one request per polled page, always starting
/// from page 0. The stream ends after the first of:
/// - a page that comes back with no items at all, or
/// - the last page the source declared (`page_index >= total_pages - 1`).
///
/// Both are honoured because they can disagree while the dataset changes
/// underneath the listing; an empty page always wins, so a source that keeps
/// over-declaring its page count cannot keep the scan going forever.
/// Emptiness is judged before the eligibility filter, so a page of nothing
/// but ineligible items does not end the scan early.
///
/// A failed request is yielded as the stream's final item.
pub fn scan<'a>(
    source: &'a SourceHandle,
    dataset_id: &'a str,
    filter: &'a PageFilter,
) -> impl Stream<Item = Result<SourcePage>> + 'a {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        let mut page_index = 0;
        loop {
            let response = match source
                .list_files(dataset_id, page_index, filter.page_size, Some(&filter.eligible_status))
                .await
                .or_raise(|| ErrorKind::Source)
            {
                Ok(response) => response,
                Err(e) => {
                    yield Err(e);
                    return;
                },
            };
            if response.items.is_empty() {
                tracing::debug!(dataset_id, page = page_index, "Source returned an empty page");
                return;
            }
            let fetched = response.items.len();
            // Sources are asked to filter by status, but that is not trusted.
            let items: Vec<_> =
                response.items.into_iter().filter(|item| item.status == filter.eligible_status).collect();
            let ineligible = (fetched - items.len()) as u64;
            let is_last = page_index.saturating_add(1) >= response.total_pages;
            tracing::debug!(
                dataset_id,
                page = page_index,
                total_pages = response.total_pages,
                eligible = items.len(),
                ineligible,
                "Fetched source page"
            );
            yield Ok(SourcePage {
                items,
                page_index,
                total_pages: response.total_pages,
                ineligible,
            });
            if is_last {
                return;
            }
            page_index += 1;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{StreamExt, TryStreamExt};
    use labelsync_remote::mock::{MockSource, item};
    use std::sync::Arc;

    fn filter(page_size: u64) -> PageFilter {
        PageFilter { page_size, eligible_status: ItemStatus::Completed }
    }

    fn items(ids: &[&str]) -> Vec<SourceItem> {
        ids.iter().map(|id| item(*id, "jpg")).collect()
    }

    #[tokio::test]
    async fn test_scans_every_page() {
        let source: SourceHandle = Arc::new(MockSource::default().with_dataset("d1", items(&["a", "b", "c", "d", "e"])));
        let filter = filter(2);
        let pages: Vec<SourcePage> = scan(&source, "d1", &filter).try_collect().await.unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages.iter().map(|p| p.page_index).collect::<Vec<_>>(), [0, 1, 2]);
        assert_eq!(pages[2].items.len(), 1);
        assert!(pages.iter().all(|p| p.total_pages == 3));
    }

    #[tokio::test]
    async fn test_stops_at_empty_page_before_declared_end() {
        let mock = Arc::new(MockSource::default().with_dataset("d1", items(&["a", "b", "c", "d"])));
        mock.declare_total_pages(3).await;
        let source: SourceHandle = mock.clone();
        let filter = filter(2);
        let pages: Vec<SourcePage> = scan(&source, "d1", &filter).try_collect().await.unwrap();
        // Page 2 was requested, came back empty, and ended the scan.
        assert_eq!(pages.len(), 2);
        assert_eq!(mock.page_requests(), 3);
    }

    #[tokio::test]
    async fn test_stops_at_declared_end_even_if_more_items_exist() {
        let mock = Arc::new(MockSource::default().with_dataset("d1", items(&["a", "b", "c", "d"])));
        mock.declare_total_pages(1).await;
        let source: SourceHandle = mock.clone();
        let filter = filter(2);
        let pages: Vec<SourcePage> = scan(&source, "d1", &filter).try_collect().await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(mock.page_requests(), 1);
    }

    #[tokio::test]
    async fn test_zero_declared_pages_still_reads_first_page() {
        let mock = Arc::new(MockSource::default().with_dataset("d1", items(&["a"])));
        mock.declare_total_pages(0).await;
        let source: SourceHandle = mock.clone();
        let filter = filter(10);
        let pages: Vec<SourcePage> = scan(&source, "d1", &filter).try_collect().await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(mock.page_requests(), 1);
    }

    #[tokio::test]
    async fn test_empty_dataset_yields_nothing() {
        let source: SourceHandle = Arc::new(MockSource::default().with_dataset("d1", Vec::new()));
        let filter = filter(10);
        let pages: Vec<SourcePage> = scan(&source, "d1", &filter).try_collect().await.unwrap();
        assert!(pages.is_empty());
    }

    #[tokio::test]
    async fn test_only_eligible_status_is_scanned() {
        let mut processing = item("b", "jpg");
        processing.status = ItemStatus::Processing;
        let source: SourceHandle = Arc::new(MockSource::default().with_dataset("d1", [item("a", "jpg"), processing]));
        let filter = PageFilter { page_size: 10, eligible_status: ItemStatus::Processing };
        let pages: Vec<SourcePage> = scan(&source, "d1", &filter).try_collect().await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].items.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(), ["b"]);
    }

    #[tokio::test]
    async fn test_failed_page_ends_stream_with_error() {
        let mock = Arc::new(MockSource::default().with_dataset("d1", items(&["a", "b", "c"])));
        mock.fail_page(1).await;
        let source: SourceHandle = mock.clone();
        let filter = filter(1);
        let results: Vec<Result<SourcePage>> = scan(&source, "d1", &filter).collect().await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(&**results[1].as_ref().unwrap_err(), ErrorKind::Source));
    }
}
