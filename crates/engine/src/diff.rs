use crate::index::CorrelationIndex;
use crate::scan::SourcePage;
use labelsync_remote::models::SourceItem;
use std::collections::HashSet;

/// What a single source page means for the destination project.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diff {
    /// Items with no task yet, in page order.
    pub to_create: Vec<SourceItem>,
    /// IDs of items that already have a task.
    pub already_present: HashSet<String>,
}

/// Split a page into items that need a task and items that already have one.
///
/// Works one page at a time; callers that need the full set of source IDs
/// (to work out deletions) keep it themselves.
pub fn diff(page: SourcePage, index: &CorrelationIndex) -> Diff {
    let mut result = Diff::default();
    for item in page.items {
        if index.contains(&item.id) {
            result.already_present.insert(item.id);
        } else {
            result.to_create.push(item);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use labelsync_remote::mock::item;

    fn page(ids: &[&str]) -> SourcePage {
        SourcePage {
            items: ids.iter().map(|id| item(*id, "jpg")).collect(),
            page_index: 0,
            total_pages: 1,
            ineligible: 0,
        }
    }

    #[test]
    fn test_splits_new_from_present() {
        let index: CorrelationIndex = [("a", 1)].into_iter().collect();
        let result = diff(page(&["a", "b", "c"]), &index);
        assert_eq!(result.to_create.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(), ["b", "c"]);
        assert_eq!(result.already_present, HashSet::from(["a".to_string()]));
    }

    #[test]
    fn test_empty_index_creates_everything() {
        let result = diff(page(&["a", "b"]), &CorrelationIndex::default());
        assert_eq!(result.to_create.len(), 2);
        assert!(result.already_present.is_empty());
    }

    #[test]
    fn test_fully_synchronized_page() {
        let index: CorrelationIndex = [("a", 1), ("b", 2), ("z", 9)].into_iter().collect();
        let result = diff(page(&["a", "b"]), &index);
        assert!(result.to_create.is_empty());
        assert_eq!(result.already_present.len(), 2);
    }

    #[test]
    fn test_empty_page() {
        let index: CorrelationIndex = [("a", 1)].into_iter().collect();
        assert_eq!(diff(page(&[]), &index), Diff::default());
    }
}
