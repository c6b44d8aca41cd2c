use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gbau_auth::Actor;
use gbau_core::{DomainError, Entity, OrderId, SellerId, UserId, VariantId, round2};

const STATUS_LEN: core::ops::RangeInclusive<usize> = 2..=20;

/// Order status.
///
/// An open set: sellers and admins may move an order to any label they like.
/// Only `Pending` (initial) and `Cancelled` (set by cancellation) carry meaning
/// here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderStatus(String);

impl OrderStatus {
    pub const PENDING: &'static str = "Pending";
    pub const CANCELLED: &'static str = "Cancelled";

    pub fn pending() -> Self {
        Self(Self::PENDING.to_string())
    }

    pub fn cancelled() -> Self {
        Self(Self::CANCELLED.to_string())
    }

    /// Accept a caller-supplied label of 2 to 20 characters.
    pub fn parse(label: impl Into<String>) -> Result<Self, DomainError> {
        let label = label.into();
        if !STATUS_LEN.contains(&label.chars().count()) {
            return Err(DomainError::validation("status must be between 2 and 20 characters"));
        }
        Ok(Self(label))
    }

    /// Rebuild from persisted state without validation.
    pub fn restore(label: String) -> Self {
        Self(label)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_cancelled(&self) -> bool {
        self.0 == Self::CANCELLED
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Price of `quantity` units at `unit_value`, to two decimals.
pub fn line_price(quantity: i64, unit_value: f64) -> f64 {
    round2(quantity as f64 * unit_value)
}

/// Order line: variant, quantity and the price fixed at purchase time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub line_no: u32,
    pub variant_id: VariantId,
    pub quantity: i64,
    /// `quantity × unit value` at purchase, rounded to cents. Never recomputed.
    pub price: f64,
}

impl OrderLine {
    pub fn priced(line_no: u32, variant_id: VariantId, quantity: i64, unit_value: f64) -> Result<Self, DomainError> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(Self {
            line_no,
            variant_id,
            quantity,
            price: line_price(quantity, unit_value),
        })
    }
}

/// Raw order line as submitted by a buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub variant_id: String,
    pub quantity: i64,
}

/// Validate submitted lines: non-empty, every id a UUID, no id repeated,
/// every quantity positive. Ids are checked before duplicates.
pub fn parse_line_requests(requests: &[LineRequest]) -> Result<Vec<(VariantId, i64)>, DomainError> {
    if requests.is_empty() {
        return Err(DomainError::validation("an order needs at least one line"));
    }

    let ids = requests
        .iter()
        .map(|r| r.variant_id.parse::<VariantId>())
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen = HashSet::with_capacity(ids.len());
    if !ids.iter().all(|id| seen.insert(*id)) {
        return Err(DomainError::validation("duplicate variant id in order"));
    }

    ids.into_iter()
        .zip(requests)
        .map(|(id, r)| {
            if r.quantity <= 0 {
                Err(DomainError::validation(format!(
                    "quantity for variant {id} must be positive"
                )))
            } else {
                Ok((id, r.quantity))
            }
        })
        .collect()
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    id: OrderId,
    buyer_id: UserId,
    seller_id: SellerId,
    status: OrderStatus,
    date: DateTime<Utc>,
    lines: Vec<OrderLine>,
}

impl Order {
    /// Place a new order in `Pending` status.
    pub fn place(
        id: OrderId,
        buyer_id: UserId,
        seller_id: SellerId,
        date: DateTime<Utc>,
        lines: Vec<OrderLine>,
    ) -> Result<Self, DomainError> {
        if lines.is_empty() {
            return Err(DomainError::validation("an order needs at least one line"));
        }
        Ok(Self {
            id,
            buyer_id,
            seller_id,
            status: OrderStatus::pending(),
            date,
            lines,
        })
    }

    /// Rebuild an order from persisted state.
    pub fn restore(
        id: OrderId,
        buyer_id: UserId,
        seller_id: SellerId,
        status: OrderStatus,
        date: DateTime<Utc>,
        lines: Vec<OrderLine>,
    ) -> Self {
        Self {
            id,
            buyer_id,
            seller_id,
            status,
            date,
            lines,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn buyer_id(&self) -> UserId {
        self.buyer_id
    }

    pub fn seller_id(&self) -> SellerId {
        self.seller_id
    }

    pub fn status(&self) -> &OrderStatus {
        &self.status
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn total(&self) -> f64 {
        round2(self.lines.iter().map(|l| l.price).sum())
    }

    /// No transition rules: any status may follow any other.
    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
    }

    /// Soft-cancel. Stock taken by the order is not returned.
    pub fn cancel(&mut self) {
        self.status = OrderStatus::cancelled();
    }
}

impl Entity for Order {
    type Id = OrderId;
    const KIND: &'static str = "Order";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Which orders an actor may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    All,
    Buyer(UserId),
    Seller(SellerId),
}

impl OrderScope {
    pub fn permits(&self, order: &Order) -> bool {
        match self {
            OrderScope::All => true,
            OrderScope::Buyer(id) => order.buyer_id == *id,
            OrderScope::Seller(id) => order.seller_id == *id,
        }
    }
}

impl From<&Actor> for OrderScope {
    fn from(actor: &Actor) -> Self {
        match actor {
            Actor::Admin(_) => OrderScope::All,
            Actor::Buyer(id) => OrderScope::Buyer(*id),
            Actor::Seller(id) => OrderScope::Seller(*id),
        }
    }
}
