use crate::utils::constants::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use serde::{Deserialize, Serialize};

/// A normalized page request: 1-based page, size within [1, 500].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Normalize raw query parameters. Out-of-range values are clamped, never rejected.
    pub fn normalize(page: Option<i64>, page_size: Option<i64>) -> Self {
        let page = page
            .unwrap_or(i64::from(DEFAULT_PAGE))
            .clamp(1, i64::from(u32::MAX));
        let page_size = page_size
            .unwrap_or(i64::from(DEFAULT_PAGE_SIZE))
            .clamp(i64::from(MIN_PAGE_SIZE), i64::from(MAX_PAGE_SIZE));

        // Both values were clamped into u32 range above
        Self {
            page: page as u32,
            page_size: page_size as u32,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::normalize(None, None)
    }
}

/// Response envelope: `{page, page_size, results: [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub page: u32,
    pub page_size: u32,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(request: PageRequest, results: Vec<T>) -> Self {
        Self {
            page: request.page,
            page_size: request.page_size,
            results,
        }
    }
}
