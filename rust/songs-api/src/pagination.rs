//! Page-number pagination shared by song listing and verse paging.

use crate::error::{Result, ServiceError};

/// Resolved window for a 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
    pub offset: i64,
}

impl PageWindow {
    /// Validates `page` against `total` items and computes the offset.
    ///
    /// `page` and `page_size` are expected to be normalised already
    /// (see [`page_param`]); values below 1 are clamped to 1 here as well.
    pub fn resolve(page: i64, page_size: i64, total: i64) -> Result<Self> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let total_pages = total_pages(total, page_size);

        if page > total_pages {
            return Err(ServiceError::PageOutOfRange { page, total_pages });
        }

        Ok(Self {
            page,
            page_size,
            total,
            total_pages,
            offset: (page - 1).saturating_mul(page_size),
        })
    }

    /// Exclusive end of the window, clamped to `total`.
    pub fn end(&self) -> i64 {
        self.offset.saturating_add(self.page_size).min(self.total)
    }
}

/// `ceil(total / page_size)`, never less than 1.
pub fn total_pages(total: i64, page_size: i64) -> i64 {
    let page_size = page_size.max(1);
    let total = total.max(0);
    (total.saturating_add(page_size - 1) / page_size).max(1)
}

/// Parses a query-string page parameter, falling back to `default` when the
/// value is missing, unparsable or below 1.
pub fn page_param(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|value| *value >= 1)
        .unwrap_or(default)
}
