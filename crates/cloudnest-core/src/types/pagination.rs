//! Pagination types for the list endpoint.

use serde::{Deserialize, Serialize};

/// Maximum page size the backend honours.
const MAX_PAGE_SIZE: u32 = 500;

/// Request parameters for one page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-based).
    pub page: u32,
    /// Number of items per page.
    pub per_page: u32,
}

impl PageRequest {
    /// Create a new page request.
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// The request for the page after this one.
    pub fn next(&self) -> Self {
        Self::new(self.page + 1, self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 100)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Current page number (1-based).
    pub current_page: u32,
    /// Last page number; equal to `current_page` when unpaginated.
    pub last_page: u32,
}

impl<T> PageResponse<T> {
    /// A response that holds the whole listing in one page.
    pub fn single(items: Vec<T>) -> Self {
        Self {
            items,
            current_page: 1,
            last_page: 1,
        }
    }

    /// Whether another page follows this one.
    pub fn has_next(&self) -> bool {
        self.current_page < self.last_page
    }
}
