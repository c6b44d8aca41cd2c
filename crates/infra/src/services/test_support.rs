//! In-memory wiring shared by the service tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use base64::prelude::*;

use gbau_auth::Actor;
use gbau_core::{ProductId, SellerId, UserId, VariantId};
use gbau_products::{NewProduct, NewVariant, Product, Variant, VariantAttributes};

use super::{OrderService, Paging, ProductService, VariantService, VariantUpload};
use crate::repository::{
    InMemoryOrderRepository, InMemoryProductRepository, InMemoryVariantRepository, ProductRepository, Slice,
    StoreError, VariantRepository,
};
use crate::storage::{InMemoryObjectStorage, ObjectStorage, StorageError};

pub const BASE_URL: &str = "http://shop.test";

pub fn png_data_url() -> String {
    format!("data:image/png;base64,{}", BASE64_STANDARD.encode(b"\x89PNG\r\n\x1a\n"))
}

/// Variant repository whose saves can be switched to fail.
pub struct SwitchableVariants {
    inner: InMemoryVariantRepository,
    fail_saves: AtomicBool,
}

#[async_trait]
impl VariantRepository for SwitchableVariants {
    async fn get(&self, id: VariantId) -> Result<Option<Variant>, StoreError> {
        self.inner.get(id).await
    }

    async fn get_many(&self, ids: &[VariantId]) -> Result<Vec<Variant>, StoreError> {
        self.inner.get_many(ids).await
    }

    async fn list_for_product(&self, product_id: ProductId) -> Result<Vec<Variant>, StoreError> {
        self.inner.list_for_product(product_id).await
    }

    async fn save(&self, variant: &Variant) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Database {
                operation: "save_variant",
                message: "connection reset".to_string(),
            });
        }
        self.inner.save(variant).await
    }

    async fn delete(&self, id: VariantId) -> Result<bool, StoreError> {
        self.inner.delete(id).await
    }

    async fn delete_for_product(&self, product_id: ProductId) -> Result<u64, StoreError> {
        self.inner.delete_for_product(product_id).await
    }

    async fn list(&self, slice: Slice) -> Result<Vec<Variant>, StoreError> {
        self.inner.list(slice).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.inner.count().await
    }
}

/// Object storage that rejects every call.
pub struct FailingStorage;

#[async_trait]
impl ObjectStorage for FailingStorage {
    async fn put(&self, _key: &str, _bytes: Vec<u8>, _content_type: &str) -> Result<String, StorageError> {
        Err(StorageError::Upload("bucket unavailable".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Delete("bucket unavailable".to_string()))
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        url.rsplit_once('/').map(|(_, key)| key.to_string())
    }
}

/// Object storage that stores objects but cannot delete them.
pub struct DeleteFailingStorage {
    inner: Arc<InMemoryObjectStorage>,
}

#[async_trait]
impl ObjectStorage for DeleteFailingStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        self.inner.put(key, bytes, content_type).await
    }

    async fn delete(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Delete("access denied".to_string()))
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        self.inner.key_for_url(url)
    }
}

pub struct Fixture {
    pub products: ProductService,
    pub variants: VariantService,
    pub orders: OrderService,
    pub storage: Arc<InMemoryObjectStorage>,
    pub product_repo: Arc<InMemoryProductRepository>,
    pub order_repo: Arc<InMemoryOrderRepository>,
    variant_repo: Arc<SwitchableVariants>,
}

impl Fixture {
    pub fn new() -> Self {
        let storage = Arc::new(InMemoryObjectStorage::new(format!("{BASE_URL}/images")));
        Self::wire(storage.clone(), storage)
    }

    pub fn with_failing_storage() -> Self {
        let unused = Arc::new(InMemoryObjectStorage::default());
        Self::wire(unused, Arc::new(FailingStorage))
    }

    pub fn with_failing_deletes() -> Self {
        let storage = Arc::new(InMemoryObjectStorage::new(format!("{BASE_URL}/images")));
        let backend = Arc::new(DeleteFailingStorage { inner: storage.clone() });
        Self::wire(storage, backend)
    }

    fn wire(storage: Arc<InMemoryObjectStorage>, backend: Arc<dyn ObjectStorage>) -> Self {
        let product_repo = Arc::new(InMemoryProductRepository::new());
        let order_repo = Arc::new(InMemoryOrderRepository::new());
        let variant_repo = Arc::new(SwitchableVariants {
            inner: InMemoryVariantRepository::new(),
            fail_saves: AtomicBool::new(false),
        });
        let paging = Paging::new(BASE_URL, 5);

        Self {
            products: ProductService::new(product_repo.clone(), variant_repo.clone(), paging.clone()),
            variants: VariantService::new(product_repo.clone(), variant_repo.clone(), backend, paging.clone()),
            orders: OrderService::new(order_repo.clone(), variant_repo.clone(), product_repo.clone(), paging),
            storage,
            product_repo,
            order_repo,
            variant_repo,
        }
    }

    pub fn fail_variant_saves(&self) {
        self.variant_repo.fail_saves.store(true, Ordering::SeqCst);
    }

    pub async fn variant_count(&self) -> u64 {
        self.variant_repo.count().await.unwrap()
    }

    pub async fn seed_product(&self, seller: SellerId, title: &str) -> Product {
        let product = Product::create(
            ProductId::new(),
            seller,
            NewProduct {
                title: title.to_string(),
                description: "Basic product".to_string(),
            },
        )
        .unwrap();
        self.product_repo.save(&product).await.unwrap();
        product
    }

    pub async fn seed_variant(&self, product: &Product, value: f64, stock: i64) -> Variant {
        let input = VariantUpload {
            variant: NewVariant {
                product_id: product.id_typed(),
                company: "Acme".to_string(),
                stock,
                value,
                attributes: VariantAttributes::default(),
            },
            image: None,
        };
        self.variants
            .insert_variant(&Actor::Admin(UserId::new()), input)
            .await
            .unwrap()
    }
}
