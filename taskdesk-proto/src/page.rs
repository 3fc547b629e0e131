//! Server-paginated list responses.

use serde::{Deserialize, Serialize};

/// One page of a server-paginated collection.
///
/// `number` is the zero-based index of the page the server actually
/// returned, which may differ from the one requested if the server clamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Entities on this page, in server order.
    pub content: Vec<T>,
    /// Total number of pages for the query.
    pub total_pages: u32,
    /// Total number of matching entities across all pages.
    #[serde(default)]
    pub total_elements: u64,
    /// Zero-based index of this page.
    pub number: u32,
    /// Requested page size.
    #[serde(default)]
    pub size: u32,
}

impl<T> Page<T> {
    /// Builds a page from a full, already filtered and sorted slice.
    ///
    /// Used by servers and test doubles; clients never paginate locally.
    #[must_use]
    pub fn slice(all: &[T], number: u32, size: u32) -> Self
    where
        T: Clone,
    {
        let size = size.max(1);
        let total = all.len();
        let total_pages = u32::try_from(total.div_ceil(size as usize)).unwrap_or(u32::MAX);
        let start = (number as usize).saturating_mul(size as usize);
        let content = all
            .iter()
            .skip(start)
            .take(size as usize)
            .cloned()
            .collect();
        Self {
            content,
            total_pages,
            total_elements: total as u64,
            number,
            size,
        }
    }

    /// Returns true if the page holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_spring_style_page() {
        let page: Page<u32> = serde_json::from_str(
            r#"{"content":[1,2],"totalPages":3,"totalElements":22,"number":1,"size":10,"first":false}"#,
        )
        .unwrap();
        assert_eq!(page.content, vec![1, 2]);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.number, 1);
    }

    #[test]
    fn minimal_page_decodes() {
        let page: Page<u32> =
            serde_json::from_str(r#"{"content":[],"totalPages":0,"number":0}"#).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total_elements, 0);
    }

    #[test]
    fn slice_middle_and_last_page() {
        let all: Vec<u32> = (0..25).collect();
        let page = Page::slice(&all, 1, 10);
        assert_eq!(page.content, (10..20).collect::<Vec<_>>());
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_elements, 25);

        let last = Page::slice(&all, 2, 10);
        assert_eq!(last.content.len(), 5);
    }

    #[test]
    fn slice_out_of_range_is_empty_with_requested_number() {
        let all: Vec<u32> = (0..5).collect();
        let page = Page::slice(&all, 4, 10);
        assert!(page.is_empty());
        assert_eq!(page.number, 4);
        assert_eq!(page.total_pages, 1);
    }
}
