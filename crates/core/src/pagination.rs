//! Page/limit pagination and the prev/next link helper shared by list endpoints.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Requested page (1-based) and optional page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub limit: Option<u32>,
}

fn first_page() -> u32 {
    1
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: None,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, limit: Option<u32>) -> Self {
        Self { page, limit }
    }

    /// Effective page size, falling back to the configured default.
    pub fn limit_or(&self, default_limit: u32) -> u32 {
        self.limit.unwrap_or(default_limit)
    }

    /// Zero-based row offset for the effective page size.
    pub fn offset(&self, default_limit: u32) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit_or(default_limit))
    }

    pub fn validate(&self, default_limit: u32) -> DomainResult<()> {
        if self.page == 0 {
            return Err(DomainError::validation("page must be at least 1"));
        }
        if self.limit_or(default_limit) == 0 {
            return Err(DomainError::validation("limit must be positive"));
        }
        Ok(())
    }
}

/// Navigation data returned next to every paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLinks {
    pub pages: u64,
    pub prev: Option<String>,
    pub next: Option<String>,
}

/// Compute page count and prev/next URLs for `resource` under `base_url`.
///
/// A page past the last one is rejected, except page 1 of an empty listing.
pub fn page_links(
    base_url: &str,
    resource: &str,
    request: PageRequest,
    default_limit: u32,
    total: u64,
) -> DomainResult<PageLinks> {
    request.validate(default_limit)?;

    let page = u64::from(request.page);
    let limit = u64::from(request.limit_or(default_limit));
    let base = base_url.trim_end_matches('/');

    let prev = (page > 1)
        .then(|| format!("{base}/{resource}?page={}&limit={limit}", page - 1));
    let next = (total > limit * page)
        .then(|| format!("{base}/{resource}?page={}&limit={limit}", page + 1));

    let pages = total.div_ceil(limit);
    if page > pages && !(total == 0 && page == 1) {
        return Err(DomainError::validation(format!("page {page} does not exist")));
    }

    Ok(PageLinks { pages, prev, next })
}
