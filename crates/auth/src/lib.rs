//! `gbau-auth` — authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it turns a
//! verified token into an [`Actor`] and answers ownership questions about it.

pub mod actor;
pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod roles;

pub use actor::Actor;
pub use authorize::{AuthzError, ensure_catalog_writer, ensure_product_owner, require_buyer, require_seller};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use roles::Role;
