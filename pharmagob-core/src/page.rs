//! Pagination requests and paginated result types.
//!
//! A [`PageRequest`] is what a caller asks for: a 1-based page and an optional limit.
//! It is normalized against [`PageLimits`] into a [`PageWindow`] before any store call,
//! so every query sees a page of at least 1 and a limit within bounds.
//!
//! Search results come back as a [`SearchResultEnvelope`] holding the total match count
//! and the documents of the requested page. [`Page`] adds navigation metadata.

use bson::Document;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::error::RepositoryResult;

/// Limits applied when normalizing a [`PageRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    /// Limit used when the caller passes none (or zero).
    pub default_limit: u64,
    /// Largest limit a caller may ask for.
    pub max_limit: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self { default_limit: 500, max_limit: 500 }
    }
}

/// A caller's pagination request. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: i64,
    pub limit: Option<i64>,
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        Self { page, limit: Some(limit) }
    }

    /// First page with the default limit.
    pub fn first() -> Self {
        Self { page: 1, limit: None }
    }

    /// Clamps the request into a usable window.
    ///
    /// A page below 1 becomes 1. A missing or non-positive limit becomes
    /// `default_limit`; a limit above `max_limit` is clamped to it.
    pub fn normalize(&self, limits: &PageLimits) -> PageWindow {
        let page = if self.page < 1 {
            warn!(page = self.page, "page below 1, using page 1");
            1
        } else {
            self.page as u64
        };

        let limit = match self.limit {
            Some(limit) if limit > 0 => {
                let limit = limit as u64;
                if limit > limits.max_limit {
                    warn!(limit, max_limit = limits.max_limit, "page limit clamped");
                    limits.max_limit
                } else {
                    limit
                }
            }
            _ => limits.default_limit,
        };

        PageWindow { page, limit }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// A normalized page: `page >= 1` and `limit >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub limit: u64,
}

impl PageWindow {
    /// Number of matches to skip before this page, saturating at `i64::MAX`
    /// so it always fits a BSON `$skip`.
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit).min(i64::MAX as u64)
    }
}

/// Total match count plus the documents of one page.
///
/// `count` is the total across all pages, not the length of `results`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SearchResultEnvelope<T> {
    pub count: u64,
    pub results: Vec<T>,
}

impl<T> SearchResultEnvelope<T> {
    pub fn new(count: u64, results: Vec<T>) -> Self {
        Self { count, results }
    }

    pub fn empty() -> Self {
        Self { count: 0, results: Vec::new() }
    }

    pub fn map<U, F>(self, f: F) -> SearchResultEnvelope<U>
    where
        F: FnMut(T) -> U,
    {
        SearchResultEnvelope {
            count: self.count,
            results: self.results.into_iter().map(f).collect(),
        }
    }

    /// Attaches navigation metadata for the window the results were fetched with.
    pub fn into_page(self, window: PageWindow) -> Page<T> {
        let seen = window.skip().saturating_add(self.results.len() as u64);
        Page {
            next_page: (seen < self.count).then(|| window.page.saturating_add(1)),
            previous_page: (window.page > 1).then(|| window.page - 1),
            count: self.count,
            items: self.results,
        }
    }
}

impl SearchResultEnvelope<Document> {
    /// Deserializes every result into `M`, failing on the first malformed document.
    pub fn into_models<M: DeserializeOwned>(self) -> RepositoryResult<SearchResultEnvelope<M>> {
        let results = self
            .results
            .into_iter()
            .map(bson::de::deserialize_from_document::<M>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SearchResultEnvelope { count: self.count, results })
    }
}

impl<T> Default for SearchResultEnvelope<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// A single page of results with navigation metadata.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The items contained in this page.
    pub items: Vec<T>,
    /// Total count of items across all pages.
    pub count: u64,
    /// The next page number (if more pages exist).
    pub next_page: Option<u64>,
    /// The previous page number (if this is not the first page).
    pub previous_page: Option<u64>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            count: 0,
            next_page: None,
            previous_page: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[test]
    fn page_below_one_is_clamped() {
        let window = PageRequest::new(0, 10).normalize(&PageLimits::default());
        assert_eq!(window, PageWindow { page: 1, limit: 10 });
        assert_eq!(window.skip(), 0);

        let window = PageRequest::new(-3, 10).normalize(&PageLimits::default());
        assert_eq!(window.page, 1);
    }

    #[test]
    fn missing_or_zero_limit_uses_default() {
        let limits = PageLimits { default_limit: 500, max_limit: 500 };

        assert_eq!(PageRequest::first().normalize(&limits).limit, 500);
        assert_eq!(PageRequest::new(1, 0).normalize(&limits).limit, 500);
        assert_eq!(PageRequest::new(1, -5).normalize(&limits).limit, 500);
    }

    #[test]
    fn oversized_limit_is_clamped() {
        let limits = PageLimits { default_limit: 20, max_limit: 100 };

        assert_eq!(PageRequest::new(1, 1_000).normalize(&limits).limit, 100);
    }

    #[test]
    fn skip_is_page_minus_one_times_limit() {
        let window = PageRequest::new(3, 20).normalize(&PageLimits::default());
        assert_eq!(window.skip(), 40);
    }

    #[test]
    fn huge_page_saturates_skip() {
        let window = PageRequest::new(i64::MAX, 500).normalize(&PageLimits::default());

        assert_eq!(window.skip(), i64::MAX as u64);
        assert_eq!(window.skip() as i64, i64::MAX);
    }

    #[test]
    fn navigation_from_count() {
        let window = PageWindow { page: 2, limit: 10 };
        let page = SearchResultEnvelope::new(25, (11..=20).collect::<Vec<u32>>()).into_page(window);

        assert_eq!(page.next_page, Some(3));
        assert_eq!(page.previous_page, Some(1));

        let last = SearchResultEnvelope::new(25, (21..=25).collect::<Vec<u32>>())
            .into_page(PageWindow { page: 3, limit: 10 });
        assert_eq!(last.next_page, None);
    }

    #[test]
    fn documents_deserialize_into_models() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Patient {
            curp: String,
        }

        let envelope = SearchResultEnvelope::new(7, vec![doc! { "curp": "GOMA800101" }]);
        let models = envelope.into_models::<Patient>().unwrap();

        assert_eq!(models.count, 7);
        assert_eq!(models.results, vec![Patient { curp: "GOMA800101".into() }]);
    }

    #[test]
    fn malformed_document_fails_the_whole_envelope() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Patient {
            curp: String,
        }

        let envelope = SearchResultEnvelope::new(2, vec![doc! { "curp": "A" }, doc! { "curp": 5 }]);
        assert!(envelope.into_models::<Patient>().is_err());
    }
}
