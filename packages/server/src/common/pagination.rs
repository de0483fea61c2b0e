//! Page/offset pagination for the REST listings.
//!
//! # Usage
//!
//! ```rust,ignore
//! // In a route handler
//! let args = PageArgs::from(query).validate();
//!
//! // In model
//! let (items, total) = Job::find_page(&args, pool).await?;
//!
//! // Build response body
//! let page = Page::new(items, total, &args);
//! ```

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

// ============================================================================
// Pagination Arguments
// ============================================================================

/// Raw `?page=&pageSize=` query values.
///
/// Kept as strings so that garbage input falls back to defaults instead of
/// failing extraction.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageArgs {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl PageArgs {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: Some(page.to_string()),
            page_size: Some(page_size.to_string()),
        }
    }

    /// Apply defaults and bounds. Never fails.
    pub fn validate(&self) -> ValidatedPageArgs {
        let page = parse_positive(self.page.as_deref()).unwrap_or(DEFAULT_PAGE);
        let page_size = parse_positive(self.page_size.as_deref())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);

        ValidatedPageArgs { page, page_size }
    }
}

fn parse_positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n >= 1)
}

/// Normalized page arguments (page >= 1, 1 <= page_size <= 100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedPageArgs {
    pub page: i64,
    pub page_size: i64,
}

impl Default for ValidatedPageArgs {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ValidatedPageArgs {
    /// SQL LIMIT value.
    pub fn limit(&self) -> i64 {
        self.page_size
    }

    /// SQL OFFSET value.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// Slice an in-memory collection the same way LIMIT/OFFSET would.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        items
            .iter()
            .skip(start)
            .take(self.page_size as usize)
            .cloned()
            .collect()
    }
}

// ============================================================================
// Page
// ============================================================================

/// One page of results plus the counters the client renders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total_count: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total_count: i64, args: &ValidatedPageArgs) -> Self {
        let total_pages = total_pages(total_count, args.page_size);

        Self {
            data,
            page: args.page,
            page_size: args.page_size,
            total_count,
            total_pages,
            has_next_page: args.page < total_pages,
            has_previous_page: args.page > 1,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
            has_next_page: self.has_next_page,
            has_previous_page: self.has_previous_page,
        }
    }
}

/// `max(1, ceil(total / page_size))`
pub fn total_pages(total_count: i64, page_size: i64) -> i64 {
    if total_count <= 0 || page_size <= 0 {
        return 1;
    }
    ((total_count + page_size - 1) / page_size).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(page: Option<&str>, page_size: Option<&str>) -> PageArgs {
        PageArgs {
            page: page.map(str::to_string),
            page_size: page_size.map(str::to_string),
        }
    }

    #[test]
    fn test_validate_defaults() {
        let validated = PageArgs::default().validate();
        assert_eq!(validated.page, 1);
        assert_eq!(validated.page_size, 10);
        assert_eq!(validated.offset(), 0);
    }

    #[test]
    fn test_validate_garbage_falls_back() {
        let validated = args(Some("abc"), Some("-5")).validate();
        assert_eq!(validated, ValidatedPageArgs::default());

        let validated = args(Some("0"), Some("0")).validate();
        assert_eq!(validated, ValidatedPageArgs::default());
    }

    #[test]
    fn test_validate_clamps_page_size() {
        let validated = args(Some("3"), Some("1000")).validate();
        assert_eq!(validated.page, 3);
        assert_eq!(validated.page_size, 100);
        assert_eq!(validated.offset(), 200);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(95, 20), 5);
    }

    #[test]
    fn test_page_past_end_is_empty_with_total() {
        let items: Vec<i32> = (0..12).collect();
        let validated = PageArgs::new(5, 10).validate();

        let page = Page::new(validated.slice(&items), items.len() as i64, &validated);

        assert!(page.data.is_empty());
        assert_eq!(page.total_count, 12);
        assert_eq!(page.total_pages, 2);
        assert!(!page.has_next_page);
        assert!(page.has_previous_page);
    }

    #[test]
    fn test_page_serializes_camel_case() {
        let validated = ValidatedPageArgs::default();
        let json = serde_json::to_value(Page::new(vec![1, 2], 2, &validated)).unwrap();

        assert_eq!(json["pageSize"], 10);
        assert_eq!(json["totalCount"], 2);
        assert_eq!(json["totalPages"], 1);
        assert_eq!(json["hasNextPage"], false);
        assert_eq!(json["hasPreviousPage"], false);
    }
}
