//! Paged catalog views
//!
//! A [`PageRequest`] carries everything needed to render one page: view mode,
//! sort, search term and page number. [`build_page`] is stateless; callers
//! keep the request between interactions and derive the next one from it.

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_PAGE_SIZE;
use crate::db::CatalogStore;
use crate::error::Result;
use crate::models::{CatalogEntry, CatalogFilter, SortKey, ViewMode};

/// One paged read against the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub view: ViewMode,
    pub sort: SortKey,
    pub ascending: bool,
    /// Free-text search; when non-blank it replaces the view mode
    pub search: String,
    /// Requested 1-based page, corrected into range when built
    pub page: i64,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PageRequest {
    /// First page of all entries, newest first
    pub fn new(page_size: u32) -> Self {
        Self {
            view: ViewMode::All,
            sort: SortKey::DateAdded,
            ascending: false,
            search: String::new(),
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Switch view mode and go back to page 1
    pub fn with_view(mut self, view: ViewMode) -> Self {
        self.view = view;
        self.page = 1;
        self
    }

    /// Switch sort key or direction and go back to page 1
    pub fn with_sort(mut self, sort: SortKey, ascending: bool) -> Self {
        self.sort = sort;
        self.ascending = ascending;
        self.page = 1;
        self
    }

    /// Set the search term and go back to page 1
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = term.into();
        self.page = 1;
        self
    }

    /// Go to an absolute page
    pub fn with_page(mut self, page: i64) -> Self {
        self.page = page;
        self
    }

    /// Move relative to the current page; the result is clamped when built
    pub fn jump(mut self, delta: i64) -> Self {
        self.page = self.page.saturating_add(delta);
        self
    }

    /// Filter the store applies for this request
    pub fn filter(&self) -> CatalogFilter {
        let term = self.search.trim();
        if term.is_empty() {
            self.view.into()
        } else {
            CatalogFilter::Search(term.to_string())
        }
    }
}

/// A rendered page plus navigation state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub entries: Vec<CatalogEntry>,
    pub total_count: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub page_size: u32,
}

impl Page {
    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// Request for the page `delta` pages away from this one
    pub fn navigate(&self, request: &PageRequest, delta: i64) -> PageRequest {
        request
            .clone()
            .with_page(self.current_page as i64)
            .jump(delta)
    }
}

/// `ceil(total / page_size)`
pub fn total_pages(total: u64, page_size: u32) -> u64 {
    total.div_ceil(u64::from(page_size.max(1)))
}

/// Clamp a requested page into `[1, total_pages]`, or 1 when there are none
pub fn clamp_page(requested: i64, total_pages: u64) -> u64 {
    if total_pages == 0 || requested < 1 {
        return 1;
    }
    (requested as u64).min(total_pages)
}

/// Count, clamp and fetch one page
pub fn build_page(store: &dyn CatalogStore, request: &PageRequest) -> Result<Page> {
    let filter = request.filter();
    let page_size = request.page_size.max(1);

    let total_count = store.count(&filter)?;
    let total_pages = total_pages(total_count, page_size);
    let current_page = clamp_page(request.page, total_pages);
    let offset = (current_page - 1) * u64::from(page_size);

    let entries = store.query(
        &filter,
        request.sort,
        request.ascending,
        offset,
        u64::from(page_size),
    )?;

    Ok(Page {
        entries,
        total_count,
        total_pages,
        current_page,
        page_size,
    })
}
