use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use gbau_auth::{Actor, require_buyer};
use gbau_core::{DomainError, Entity, OrderId, PageRequest, VariantId};
use gbau_inventory::{sell_from_product, sell_from_variant};
use gbau_products::{Product, Variant};
use gbau_sales::{LineRequest, Order, OrderLine, OrderScope, OrderStatus, parse_line_requests};

use super::{Listing, Paging, ServiceResult};
use crate::repository::{OrderRepository, ProductRepository, VariantRepository};

pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    variants: Arc<dyn VariantRepository>,
    products: Arc<dyn ProductRepository>,
    paging: Paging,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        variants: Arc<dyn VariantRepository>,
        products: Arc<dyn ProductRepository>,
        paging: Paging,
    ) -> Self {
        Self {
            orders,
            variants,
            products,
            paging,
        }
    }

    /// Place an order for the acting buyer.
    ///
    /// Everything that can be rejected (malformed or duplicate ids, unknown
    /// variants, bad quantities) is rejected before the first write. The order
    /// is then stored in one write, after which stock is taken line by line.
    /// A failure while taking stock is returned but the order stays stored.
    #[instrument(skip(self, lines), fields(actor = %actor, lines = lines.len()), err)]
    pub async fn insert_order(&self, actor: &Actor, lines: Vec<LineRequest>) -> ServiceResult<Order> {
        let buyer_id = require_buyer(actor)?;
        let requested = parse_line_requests(&lines)?;

        let ids: Vec<VariantId> = requested.iter().map(|(id, _)| *id).collect();
        let found = self.variants.get_many(&ids).await?;
        let variants = ids
            .iter()
            .map(|id| {
                found
                    .iter()
                    .find(|v| v.id_typed() == *id)
                    .ok_or_else(|| Variant::not_found(id))
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        // The order belongs to the seller of the first line's product.
        let first_product = variants
            .first()
            .map(|v| v.product_id())
            .ok_or_else(|| DomainError::validation("an order needs at least one line"))?;
        let seller_id = self
            .products
            .get(first_product)
            .await?
            .ok_or_else(|| Product::not_found(&first_product))?
            .seller_id();

        let order_lines = requested
            .iter()
            .zip(&variants)
            .enumerate()
            .map(|(idx, ((id, quantity), variant))| OrderLine::priced(idx as u32 + 1, *id, *quantity, variant.value()))
            .collect::<Result<Vec<_>, DomainError>>()?;

        let order = Order::place(OrderId::new(), buyer_id, seller_id, Utc::now(), order_lines)?;
        self.orders.insert(&order).await?;
        info!(order_id = %order.id_typed(), seller_id = %seller_id, total = order.total(), "order placed");

        for line in order.lines() {
            self.take_stock(line.variant_id, line.quantity).await?;
        }

        Ok(order)
    }

    /// Orders visible to `actor`, one page at a time.
    pub async fn find_orders(&self, actor: &Actor, page: PageRequest) -> ServiceResult<Listing<Order>> {
        let scope = OrderScope::from(actor);
        let total = self.orders.count(scope).await?;
        let (links, slice) = self.paging.plan("orders", page, total)?;
        let items = self.orders.list(scope, slice).await?;
        Ok(Listing::new(items, links))
    }

    /// An order outside the actor's scope is reported as missing.
    pub async fn get_order(&self, actor: &Actor, id: OrderId) -> ServiceResult<Order> {
        let scope = OrderScope::from(actor);
        match self.orders.get(id).await? {
            Some(order) if scope.permits(&order) => Ok(order),
            _ => Err(Order::not_found(&id).into()),
        }
    }

    /// Set an order's status. Any status may follow any other.
    #[instrument(skip(self, status), fields(actor = %actor, order_id = %id), err)]
    pub async fn update_order(&self, actor: &Actor, id: OrderId, status: String) -> ServiceResult<Order> {
        let status = OrderStatus::parse(status)?;
        let mut order = self.get_order(actor, id).await?;

        if !self.orders.update_status(id, &status).await? {
            return Err(Order::not_found(&id).into());
        }
        info!(status = %status, "order status changed");
        order.set_status(status);
        Ok(order)
    }

    /// Mark an order cancelled. Stock taken by the order is not returned.
    #[instrument(skip(self), fields(actor = %actor, order_id = %id), err)]
    pub async fn cancel_order(&self, actor: &Actor, id: OrderId) -> ServiceResult<String> {
        let mut order = self.get_order(actor, id).await?;
        order.cancel();

        if !self.orders.update_status(id, order.status()).await? {
            return Err(Order::not_found(&id).into());
        }
        info!("order cancelled");
        Ok(format!("Order {id} was cancelled."))
    }

    /// Take `quantity` units from a variant and then from its product.
    ///
    /// Both rows are re-read and written separately.
    async fn take_stock(&self, variant_id: VariantId, quantity: i64) -> ServiceResult<()> {
        let mut variant = self
            .variants
            .get(variant_id)
            .await?
            .ok_or_else(|| Variant::not_found(&variant_id))?;
        sell_from_variant(&mut variant, quantity)?;
        self.variants.save(&variant).await?;

        let product_id = variant.product_id();
        let mut product = self
            .products
            .get(product_id)
            .await?
            .ok_or_else(|| Product::not_found(&product_id))?;
        sell_from_product(&mut product, quantity)?;
        self.products.save(&product).await?;

        info!(
            variant_id = %variant_id,
            product_id = %product_id,
            quantity,
            variant_stock = variant.stock(),
            product_stock = product.stock(),
            "stock taken"
        );
        Ok(())
    }
}
