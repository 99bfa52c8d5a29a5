use serde::Serialize;
use utoipa::ToSchema;

use crate::config::{DEFAULT_PAGE_SIZE, MAX_PAGE, MAX_PAGE_SIZE};

pub fn default_page() -> u64 {
    1
}

pub fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

/// A clamped page request: `page` is within `1..=MAX_PAGE`, `page_size` within `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self {
            page: page.clamp(1, MAX_PAGE),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.page_size)
            .min(i64::MAX as u64)
    }

    pub fn meta(&self, total: u64) -> PageMeta {
        PageMeta {
            page: self.page,
            page_size: self.page_size,
            total,
            total_pages: total.div_ceil(self.page_size),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct PageMeta {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub total_pages: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps() {
        let request = PageRequest::new(0, 1000);
        assert_eq!(request.page, 1);
        assert_eq!(request.page_size, MAX_PAGE_SIZE);

        let request = PageRequest::new(3, 0);
        assert_eq!(request.page_size, 1);
        assert_eq!(request.offset(), 2);
    }

    #[test]
    fn test_huge_page_is_clamped() {
        let request = PageRequest::new(u64::MAX, 100);
        assert_eq!(request.page, MAX_PAGE);
        assert_eq!(request.offset(), (MAX_PAGE - 1) * 100);
        assert!(request.offset() <= i64::MAX as u64);
        assert_eq!(request.meta(5).total_pages, 1);
    }

    #[test]
    fn test_offset_saturates_for_unclamped_values() {
        let request = PageRequest {
            page: u64::MAX,
            page_size: u64::MAX,
        };
        assert_eq!(request.offset(), i64::MAX as u64);
    }

    #[test]
    fn test_meta_total_pages() {
        let request = PageRequest::new(2, 20);
        assert_eq!(request.offset(), 20);
        let meta = request.meta(41);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(request.meta(0).total_pages, 0);
    }
}
