use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use gbau_core::{Entity, OrderId, ProductId, VariantId};
use gbau_products::{Product, Variant};
use gbau_sales::{Order, OrderScope, OrderStatus};

use super::{OrderRepository, ProductRepository, Slice, StoreError, VariantRepository};

/// In-memory table keyed by entity id, for tests/dev.
///
/// Rows iterate in id order; ids are time-ordered UUIDs, so listings come back
/// oldest first. The lock is held for a single call only.
#[derive(Debug)]
pub struct InMemoryRepository<E: Entity> {
    rows: RwLock<BTreeMap<E::Id, E>>,
}

pub type InMemoryProductRepository = InMemoryRepository<Product>;
pub type InMemoryVariantRepository = InMemoryRepository<Variant>;
pub type InMemoryOrderRepository = InMemoryRepository<Order>;

impl<E: Entity> InMemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<E: Entity> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> InMemoryRepository<E>
where
    E: Entity + Clone,
    E::Id: Ord,
{
    fn fetch(&self, id: &E::Id) -> Result<Option<E>, StoreError> {
        let rows = self.rows.read().map_err(|_| StoreError::Poisoned)?;
        Ok(rows.get(id).cloned())
    }

    fn put(&self, row: &E) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned)?;
        rows.insert(*row.id(), row.clone());
        Ok(())
    }

    fn remove(&self, id: &E::Id) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned)?;
        Ok(rows.remove(id).is_some())
    }

    fn remove_where(&self, pred: impl Fn(&E) -> bool) -> Result<u64, StoreError> {
        let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned)?;
        let before = rows.len();
        rows.retain(|_, row| !pred(row));
        Ok((before - rows.len()) as u64)
    }

    fn modify(&self, id: &E::Id, f: impl FnOnce(&mut E)) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned)?;
        Ok(rows.get_mut(id).map(f).is_some())
    }

    fn select(&self, pred: impl Fn(&E) -> bool, slice: Option<Slice>) -> Result<Vec<E>, StoreError> {
        let rows = self.rows.read().map_err(|_| StoreError::Poisoned)?;
        let matching = rows.values().filter(|row| pred(row));
        Ok(match slice {
            Some(Slice { offset, limit }) => matching
                .skip(usize::try_from(offset).unwrap_or(usize::MAX))
                .take(limit as usize)
                .cloned()
                .collect(),
            None => matching.cloned().collect(),
        })
    }

    fn count_where(&self, pred: impl Fn(&E) -> bool) -> Result<u64, StoreError> {
        let rows = self.rows.read().map_err(|_| StoreError::Poisoned)?;
        Ok(rows.values().filter(|row| pred(row)).count() as u64)
    }
}

#[async_trait]
impl ProductRepository for InMemoryRepository<Product> {
    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.fetch(&id)
    }

    async fn save(&self, product: &Product) -> Result<(), StoreError> {
        self.put(product)
    }

    async fn delete(&self, id: ProductId) -> Result<bool, StoreError> {
        self.remove(&id)
    }

    async fn list(&self, slice: Slice) -> Result<Vec<Product>, StoreError> {
        self.select(|_| true, Some(slice))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.count_where(|_| true)
    }
}

#[async_trait]
impl VariantRepository for InMemoryRepository<Variant> {
    async fn get(&self, id: VariantId) -> Result<Option<Variant>, StoreError> {
        self.fetch(&id)
    }

    async fn get_many(&self, ids: &[VariantId]) -> Result<Vec<Variant>, StoreError> {
        self.select(|v| ids.contains(&v.id_typed()), None)
    }

    async fn list_for_product(&self, product_id: ProductId) -> Result<Vec<Variant>, StoreError> {
        self.select(|v| v.product_id() == product_id, None)
    }

    async fn save(&self, variant: &Variant) -> Result<(), StoreError> {
        self.put(variant)
    }

    async fn delete(&self, id: VariantId) -> Result<bool, StoreError> {
        self.remove(&id)
    }

    async fn delete_for_product(&self, product_id: ProductId) -> Result<u64, StoreError> {
        self.remove_where(|v| v.product_id() == product_id)
    }

    async fn list(&self, slice: Slice) -> Result<Vec<Variant>, StoreError> {
        self.select(|_| true, Some(slice))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.count_where(|_| true)
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepository<Order> {
    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.fetch(&id)
    }

    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        self.put(order)
    }

    async fn update_status(&self, id: OrderId, status: &OrderStatus) -> Result<bool, StoreError> {
        self.modify(&id, |order| order.set_status(status.clone()))
    }

    async fn list(&self, scope: OrderScope, slice: Slice) -> Result<Vec<Order>, StoreError> {
        self.select(|o| scope.permits(o), Some(slice))
    }

    async fn count(&self, scope: OrderScope) -> Result<u64, StoreError> {
        self.count_where(|o| scope.permits(o))
    }
}
