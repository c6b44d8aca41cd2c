use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gbau_core::{SellerId, UserId};

use crate::Role;

/// The authenticated party behind a request.
///
/// Admins have unrestricted visibility; buyers see what they bought; sellers
/// see what they sell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "lowercase")]
pub enum Actor {
    Admin(UserId),
    Buyer(UserId),
    Seller(SellerId),
}

impl Actor {
    /// Interpret a token subject according to its role.
    pub fn from_subject(role: Role, subject: Uuid) -> Self {
        match role {
            Role::Admin => Actor::Admin(UserId::from_uuid(subject)),
            Role::Buyer => Actor::Buyer(UserId::from_uuid(subject)),
            Role::Seller => Actor::Seller(SellerId::from_uuid(subject)),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Actor::Admin(_) => Role::Admin,
            Actor::Buyer(_) => Role::Buyer,
            Actor::Seller(_) => Role::Seller,
        }
    }

    pub fn subject(&self) -> Uuid {
        match self {
            Actor::Admin(id) | Actor::Buyer(id) => *id.as_uuid(),
            Actor::Seller(id) => *id.as_uuid(),
        }
    }
}

impl core::fmt::Display for Actor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.role(), self.subject())
    }
}
