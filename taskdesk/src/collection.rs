//! Paginated collection state for one list view.

use crate::api::ApiError;

/// The current page of a server-paginated collection.
///
/// Holds only the entities of the page last applied. Rows are never
/// patched individually: a successful fetch replaces the whole page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionState<T> {
    items: Vec<T>,
    total_pages: u32,
    current_page: u32,
    loading: bool,
    error: Option<ApiError>,
}

impl<T> Default for CollectionState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total_pages: 0,
            current_page: 0,
            loading: false,
            error: None,
        }
    }
}

impl<T> CollectionState<T> {
    /// Creates an empty, idle collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the page contents atomically. `current_page` is the index
    /// the server reported, not the one requested.
    pub fn replace_page(&mut self, items: Vec<T>, total_pages: u32, current_page: u32) {
        self.items = items;
        self.total_pages = total_pages;
        self.current_page = current_page;
    }

    /// Sets the advisory loading flag.
    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Sets or clears the last error.
    pub fn set_error(&mut self, error: Option<ApiError>) {
        self.error = error;
    }

    /// Entities on the current page.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Total number of pages reported by the server.
    #[must_use]
    pub const fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Index of the page currently held.
    #[must_use]
    pub const fn current_page(&self) -> u32 {
        self.current_page
    }

    /// True while a fetch for the current descriptor is outstanding.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Error from the most recent failed fetch, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    /// True if there is a page after the current one.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.current_page.saturating_add(1) < self.total_pages
    }

    /// True if there is a page before the current one.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.current_page > 0
    }
}
