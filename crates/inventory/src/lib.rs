//! Inventory reconciliation rules.
//!
//! A product's `stock` and `average_price` are derived from its variants. This
//! crate holds the rules that keep them in step when variants are added,
//! restocked or sold, implemented purely as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod reconcile;

pub use reconcile::{average_price, fold_new_variant, sell_from_product, sell_from_variant, stock_delta};
