//! Persistence ports for products, variants and orders.
//!
//! Each repository call is an independent write: nothing here spans several
//! aggregates, so multi-step use cases are not atomic as a whole.

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryOrderRepository, InMemoryProductRepository, InMemoryRepository, InMemoryVariantRepository};
pub use postgres::PostgresRepository;

use async_trait::async_trait;
use thiserror::Error;

use gbau_core::{OrderId, ProductId, VariantId};
use gbau_products::{Product, Variant};
use gbau_sales::{Order, OrderScope, OrderStatus};

/// Repository failure. Lookups that find nothing return `Ok(None)`, not an error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error in {operation}: {message}")]
    Database { operation: &'static str, message: String },

    #[error("corrupt {table} row: {message}")]
    Corrupt { table: &'static str, message: String },

    #[error("store lock poisoned")]
    Poisoned,
}

/// Offset/limit slice of an ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    pub offset: u64,
    pub limit: u32,
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError>;
    /// Insert or overwrite.
    async fn save(&self, product: &Product) -> Result<(), StoreError>;
    /// Returns whether a row was removed.
    async fn delete(&self, id: ProductId) -> Result<bool, StoreError>;
    async fn list(&self, slice: Slice) -> Result<Vec<Product>, StoreError>;
    async fn count(&self) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait VariantRepository: Send + Sync {
    async fn get(&self, id: VariantId) -> Result<Option<Variant>, StoreError>;
    /// Fetch every variant whose id is in `ids`; unknown ids are skipped.
    async fn get_many(&self, ids: &[VariantId]) -> Result<Vec<Variant>, StoreError>;
    async fn list_for_product(&self, product_id: ProductId) -> Result<Vec<Variant>, StoreError>;
    /// Insert or overwrite.
    async fn save(&self, variant: &Variant) -> Result<(), StoreError>;
    async fn delete(&self, id: VariantId) -> Result<bool, StoreError>;
    async fn delete_for_product(&self, product_id: ProductId) -> Result<u64, StoreError>;
    async fn list(&self, slice: Slice) -> Result<Vec<Variant>, StoreError>;
    async fn count(&self) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError>;
    /// Store a new order together with all of its lines in one write.
    async fn insert(&self, order: &Order) -> Result<(), StoreError>;
    /// Returns whether the order existed.
    async fn update_status(&self, id: OrderId, status: &OrderStatus) -> Result<bool, StoreError>;
    async fn list(&self, scope: OrderScope, slice: Slice) -> Result<Vec<Order>, StoreError>;
    async fn count(&self, scope: OrderScope) -> Result<u64, StoreError>;
}
