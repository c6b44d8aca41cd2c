//! Ownership checks at the service boundary.
//!
//! - No IO
//! - No panics
//! - No business logic (pure policy check)

use thiserror::Error;

use gbau_core::{DomainError, SellerId, UserId};

use crate::Actor;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("only {0} accounts may perform this action")]
    WrongRole(&'static str),

    #[error("you must own the product to modify it")]
    NotOwner,
}

impl From<AuthzError> for DomainError {
    fn from(value: AuthzError) -> Self {
        DomainError::Forbidden(value.to_string())
    }
}

/// The buyer identity placing an order.
pub fn require_buyer(actor: &Actor) -> Result<UserId, AuthzError> {
    match actor {
        Actor::Buyer(id) => Ok(*id),
        _ => Err(AuthzError::WrongRole("buyer")),
    }
}

/// The seller identity creating a product.
pub fn require_seller(actor: &Actor) -> Result<SellerId, AuthzError> {
    match actor {
        Actor::Seller(id) => Ok(*id),
        _ => Err(AuthzError::WrongRole("seller")),
    }
}

/// Sellers and admins manage variants; buyers do not.
pub fn ensure_catalog_writer(actor: &Actor) -> Result<(), AuthzError> {
    match actor {
        Actor::Admin(_) | Actor::Seller(_) => Ok(()),
        Actor::Buyer(_) => Err(AuthzError::WrongRole("seller or admin")),
    }
}

/// Admins may edit any product; sellers only their own.
pub fn ensure_product_owner(actor: &Actor, owner: SellerId) -> Result<(), AuthzError> {
    match actor {
        Actor::Admin(_) => Ok(()),
        Actor::Seller(id) if *id == owner => Ok(()),
        Actor::Seller(_) => Err(AuthzError::NotOwner),
        Actor::Buyer(_) => Err(AuthzError::WrongRole("seller or admin")),
    }
}
