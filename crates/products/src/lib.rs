//! Catalog domain module: products and their purchasable variants.
//!
//! This crate contains business rules for the catalog, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). The derived
//! stock/average-price fields of a product are maintained by `gbau-inventory`.

pub mod product;
pub mod variant;

pub use product::{CatalogEdit, NewProduct, Product};
pub use variant::{Color, NewVariant, Size, Variant, VariantAttributes, VariantPatch, variant_name};
