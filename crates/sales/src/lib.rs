//! Orders domain module.
//!
//! This crate contains business rules for buyer orders, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod order;

pub use order::{LineRequest, Order, OrderLine, OrderScope, OrderStatus, line_price, parse_line_requests};
