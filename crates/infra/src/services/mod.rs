//! Catalog and order use cases.
//!
//! Services receive their collaborators as `Arc<dyn ...>` at construction time.
//! Every use case is a sequence of independent repository calls: a failure
//! part-way leaves earlier writes in place.

pub mod orders;
pub mod products;
pub mod variants;

pub use orders::OrderService;
pub use products::ProductService;
pub use variants::{VariantService, VariantUpdate, VariantUpload};

use serde::Serialize;
use thiserror::Error;

use gbau_auth::AuthzError;
use gbau_core::{DomainError, PageLinks, PageRequest, page_links};

use crate::repository::{Slice, StoreError};
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<AuthzError> for ServiceError {
    fn from(err: AuthzError) -> Self {
        Self::Domain(err.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Settings shared by every paginated listing.
#[derive(Debug, Clone)]
pub struct Paging {
    /// Base URL for prev/next links.
    pub base_url: String,
    pub default_limit: u32,
}

impl Paging {
    pub fn new(base_url: impl Into<String>, default_limit: u32) -> Self {
        Self {
            base_url: base_url.into(),
            default_limit,
        }
    }

    /// Validate the request against `total` rows and return links plus the slice to fetch.
    fn plan(&self, resource: &str, request: PageRequest, total: u64) -> ServiceResult<(PageLinks, Slice)> {
        let links = page_links(&self.base_url, resource, request, self.default_limit, total)?;
        let slice = Slice {
            offset: request.offset(self.default_limit),
            limit: request.limit_or(self.default_limit),
        };
        Ok((links, slice))
    }
}

/// One page of a listing with its navigation links.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub pages: u64,
    pub prev: Option<String>,
    pub next: Option<String>,
}

impl<T> Listing<T> {
    fn new(items: Vec<T>, links: PageLinks) -> Self {
        Self {
            items,
            pages: links.pages,
            prev: links.prev,
            next: links.next,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support;
