//! `gbau-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod pagination;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{OrderId, ProductId, SellerId, UserId, VariantId};
pub use money::{MAX_PRICE, round2};
pub use pagination::{PageLinks, PageRequest, page_links};
