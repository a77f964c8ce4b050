//! Response helpers and the `{count, next, previous, results}` page envelope.

use crate::config::PagingConfig;
use crate::error::{AppError, AppResult};
use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(data))
}

pub fn ok<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(data))
}

/// Raw `?page=&size=` values; parsed leniently by [`PageWindow::resolve`].
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub size: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based page number, always within `1..=num_pages`.
    pub number: u64,
    pub size: u64,
    pub num_pages: u64,
}

impl PageWindow {
    /// Page size from the query: default when absent, capped at the configured maximum.
    pub fn page_size(query: &PageQuery, paging: &PagingConfig) -> AppResult<u64> {
        match query.size.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(paging.default_size),
            Some(raw) => match raw.parse::<u64>() {
                Ok(n) if n > 0 => Ok(n.min(paging.max_size)),
                _ => Err(AppError::validation("size", "A valid positive integer is required.")),
            },
        }
    }

    /// Resolve the requested page against `count` items. A missing or non-numeric page
    /// is the first page, a number past the end is the last page. There is always at
    /// least one (possibly empty) page.
    pub fn resolve(query: &PageQuery, paging: &PagingConfig, count: u64) -> AppResult<Self> {
        let size = Self::page_size(query, paging)?;
        let num_pages = count.div_ceil(size).max(1);
        let requested = query
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<u64>().ok())
            .unwrap_or(1);
        Ok(PageWindow {
            number: requested.clamp(1, num_pages),
            size,
            num_pages,
        })
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.size
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// `base_path` is the collection path the links point back to, e.g. `/api/books/`.
    pub fn new(window: PageWindow, count: u64, results: Vec<T>, base_path: &str) -> Self {
        let link = |number: u64| format!("{}?page={}&size={}", base_path, number, window.size);
        Page {
            count,
            next: window.has_next().then(|| link(window.number + 1)),
            previous: window.has_previous().then(|| link(window.number - 1)),
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<&str>, size: Option<&str>) -> PageQuery {
        PageQuery {
            page: page.map(String::from),
            size: size.map(String::from),
        }
    }

    #[test]
    fn twelve_items_in_pages_of_five() {
        let paging = PagingConfig::default();
        let first = PageWindow::resolve(&query(None, Some("5")), &paging, 12).unwrap();
        assert_eq!((first.number, first.num_pages, first.offset()), (1, 3, 0));
        assert!(first.has_next());
        assert!(!first.has_previous());

        let last = PageWindow::resolve(&query(Some("3"), Some("5")), &paging, 12).unwrap();
        assert_eq!(last.offset(), 10);
        assert!(!last.has_next());
        assert!(last.has_previous());

        let page = Page::new(last, 12, vec![11, 12], "/api/books/");
        assert_eq!(page.next, None);
        assert_eq!(page.previous.as_deref(), Some("/api/books/?page=2&size=5"));
    }

    #[test]
    fn lenient_page_numbers() {
        let paging = PagingConfig::default();
        let resolve = |p: &str| PageWindow::resolve(&query(Some(p), None), &paging, 25).unwrap().number;
        assert_eq!(resolve("abc"), 1);
        assert_eq!(resolve("0"), 1);
        assert_eq!(resolve("-2"), 1);
        assert_eq!(resolve("99"), 3);
        assert_eq!(resolve(" 2 "), 2);
    }

    #[test]
    fn empty_collection_has_one_page() {
        let window = PageWindow::resolve(&PageQuery::default(), &PagingConfig::default(), 0).unwrap();
        assert_eq!((window.number, window.num_pages, window.size), (1, 1, 10));
        let page: Page<u8> = Page::new(window, 0, vec![], "/api/members/");
        assert!(page.next.is_none() && page.previous.is_none());
    }

    #[test]
    fn page_size_is_validated_and_capped() {
        let paging = PagingConfig {
            default_size: 10,
            max_size: 50,
        };
        assert_eq!(PageWindow::page_size(&query(None, Some("500")), &paging).unwrap(), 50);
        assert!(PageWindow::page_size(&query(None, Some("0")), &paging).is_err());
        assert!(PageWindow::page_size(&query(None, Some("ten")), &paging).is_err());
        assert_eq!(PageWindow::page_size(&query(None, Some("")), &paging).unwrap(), 10);
    }
}
