use serde::{Deserialize, Serialize};

/// Which page of a list to show. `page_index` is zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page_size: usize,
    pub page_index: usize,
}

impl PageRequest {
    pub fn new(page_size: usize, page_index: usize) -> Self {
        Self {
            page_size,
            page_index,
        }
    }

    pub fn first(page_size: usize) -> Self {
        Self::new(page_size, 0)
    }
}

/// One slice of an ordered list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    pub page_index: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T> Page<'_, T> {
    pub fn has_previous(&self) -> bool {
        self.page_index > 0 && self.page_index < self.total_pages
    }

    pub fn has_next(&self) -> bool {
        self.page_index.saturating_add(1) < self.total_pages
    }

    /// Position of the first item on this page within the full list
    pub fn offset(&self, page_size: usize) -> usize {
        self.page_index.saturating_mul(page_size)
    }
}

/// Slice `items` into the requested page.
///
/// An empty list still reports one page. Out-of-range pages and a zero page
/// size yield an empty slice.
pub fn paginate<'a, T>(items: &'a [T], request: &PageRequest) -> Page<'a, T> {
    let total_items = items.len();
    let total_pages = if request.page_size == 0 {
        1
    } else {
        total_items.div_ceil(request.page_size).max(1)
    };

    let start = request.page_index.saturating_mul(request.page_size);
    let slice = if request.page_size == 0 || start >= total_items {
        &items[0..0]
    } else {
        let end = start.saturating_add(request.page_size).min(total_items);
        &items[start..end]
    };

    Page {
        items: slice,
        page_index: request.page_index,
        total_pages,
        total_items,
    }
}
