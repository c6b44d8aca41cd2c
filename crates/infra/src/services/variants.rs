use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use gbau_auth::{Actor, ensure_catalog_writer};
use gbau_core::{Entity, PageRequest, ProductId, VariantId};
use gbau_inventory::{fold_new_variant, stock_delta};
use gbau_products::{NewVariant, Product, Variant, VariantPatch};

use super::{Listing, Paging, ServiceResult};
use crate::repository::{ProductRepository, VariantRepository};
use crate::storage::{ObjectStorage, decode_image, image_key};

/// Input: create a variant, optionally with an image.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VariantUpload {
    #[serde(flatten)]
    pub variant: NewVariant,
    /// Base64 image, bare or as a `data:image/...;base64,` URL.
    #[serde(default)]
    pub image: Option<String>,
}

/// Input: partial update of a variant, optionally replacing its image.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VariantUpdate {
    #[serde(flatten)]
    pub patch: VariantPatch,
    #[serde(default)]
    pub image: Option<String>,
}

pub struct VariantService {
    products: Arc<dyn ProductRepository>,
    variants: Arc<dyn VariantRepository>,
    storage: Arc<dyn ObjectStorage>,
    paging: Paging,
}

impl VariantService {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        variants: Arc<dyn VariantRepository>,
        storage: Arc<dyn ObjectStorage>,
        paging: Paging,
    ) -> Self {
        Self {
            products,
            variants,
            storage,
            paging,
        }
    }

    pub async fn list_variants(&self, page: PageRequest) -> ServiceResult<Listing<Variant>> {
        let total = self.variants.count().await?;
        let (links, slice) = self.paging.plan("variants", page, total)?;
        let items = self.variants.list(slice).await?;
        Ok(Listing::new(items, links))
    }

    pub async fn get_variant(&self, id: VariantId) -> ServiceResult<Variant> {
        self.variants
            .get(id)
            .await?
            .ok_or_else(|| Variant::not_found(&id).into())
    }

    /// Add a variant and fold it into its product's stock and average price.
    ///
    /// The image is uploaded before the product is loaded; an upload failure
    /// aborts with nothing written. The product is saved before the variant.
    #[instrument(
        skip(self, input),
        fields(actor = %actor, product_id = %input.variant.product_id),
        err
    )]
    pub async fn insert_variant(&self, actor: &Actor, input: VariantUpload) -> ServiceResult<Variant> {
        ensure_catalog_writer(actor)?;
        input.variant.validate()?;

        let product_id = input.variant.product_id;
        let image = match input.image.as_deref() {
            Some(payload) => Some(self.upload_image(payload, product_id).await?),
            None => None,
        };

        let mut product = self
            .products
            .get(product_id)
            .await?
            .ok_or_else(|| Product::not_found(&product_id))?;
        let siblings = self.variants.list_for_product(product_id).await?;

        let variant = Variant::create(VariantId::new(), &product, input.variant, image)?;
        fold_new_variant(&mut product, &siblings, &variant)?;

        self.products.save(&product).await?;
        self.variants.save(&variant).await?;

        info!(
            variant_id = %variant.id_typed(),
            product_stock = product.stock(),
            average_price = product.average_price(),
            "variant created"
        );
        Ok(variant)
    }

    /// Merge a partial update into a variant.
    ///
    /// A patch carrying `stock` shifts the product's stock by the difference.
    /// The product's average price is left as is.
    #[instrument(skip(self, update), fields(actor = %actor, variant_id = %id), err)]
    pub async fn update_variant(&self, actor: &Actor, id: VariantId, update: VariantUpdate) -> ServiceResult<Variant> {
        ensure_catalog_writer(actor)?;
        let mut variant = self.get_variant(id).await?;
        update.patch.validate()?;
        let delta = stock_delta(&variant, &update.patch)?;

        let image = match update.image.as_deref() {
            Some(payload) => Some(self.replace_image(&variant, payload).await?),
            None => None,
        };

        if let Some(delta) = delta {
            let product_id = variant.product_id();
            let mut product = self
                .products
                .get(product_id)
                .await?
                .ok_or_else(|| Product::not_found(&product_id))?;
            product.adjust_stock(delta)?;
            self.products.save(&product).await?;
            info!(product_id = %product_id, delta, product_stock = product.stock(), "product stock adjusted");
        }

        variant.apply_patch(update.patch)?;
        if image.is_some() {
            variant.set_image(image);
        }
        self.variants.save(&variant).await?;
        Ok(variant)
    }

    /// Remove a variant. The owning product's stock and average price are not adjusted.
    #[instrument(skip(self), fields(actor = %actor, variant_id = %id), err)]
    pub async fn delete_variant(&self, actor: &Actor, id: VariantId) -> ServiceResult<String> {
        ensure_catalog_writer(actor)?;
        if !self.variants.delete(id).await? {
            return Err(Variant::not_found(&id).into());
        }
        Ok(format!("Variant with id {id} was removed."))
    }

    async fn upload_image(&self, payload: &str, product_id: ProductId) -> ServiceResult<String> {
        let image = decode_image(payload)?;
        let key = image_key(Utc::now().timestamp_millis(), product_id);
        let url = self.storage.put(&key, image.bytes, &image.content_type).await?;
        Ok(url)
    }

    /// Delete the current image (if any), then upload the new one.
    async fn replace_image(&self, variant: &Variant, payload: &str) -> ServiceResult<String> {
        // reject a bad payload before touching the stored object
        decode_image(payload)?;

        if let Some(old_url) = variant.image() {
            match self.storage.key_for_url(old_url) {
                Some(key) => {
                    if let Err(e) = self.storage.delete(&key).await {
                        error!(error = %e, key = %key, "failed to delete previous variant image");
                        return Err(e.into());
                    }
                }
                None => warn!(url = %old_url, "previous image URL not recognised; leaving object in place"),
            }
        }

        self.upload_image(payload, variant.product_id()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceError;
    use crate::services::test_support::{Fixture, png_data_url};
    use gbau_core::{DomainError, SellerId, UserId};
    use gbau_products::VariantAttributes;

    fn upload(product: &Product, value: f64, stock: i64) -> VariantUpload {
        VariantUpload {
            variant: NewVariant {
                product_id: product.id_typed(),
                company: "Acme".to_string(),
                stock,
                value,
                attributes: VariantAttributes::default(),
            },
            image: None,
        }
    }

    fn seller() -> Actor {
        Actor::Seller(SellerId::new())
    }

    #[tokio::test]
    async fn inserting_variants_accumulates_stock_and_averages_price() {
        let fx = Fixture::new();
        let p = fx.seed_product(SellerId::new(), "Tee").await;

        fx.variants.insert_variant(&seller(), upload(&p, 10.0, 5)).await.unwrap();
        let after_a = fx.products.get_product(p.id_typed()).await.unwrap();
        assert_eq!(after_a.stock(), 5);
        assert_eq!(after_a.average_price(), 10.0);

        fx.variants.insert_variant(&seller(), upload(&p, 20.0, 3)).await.unwrap();
        let after_b = fx.products.get_product(p.id_typed()).await.unwrap();
        assert_eq!(after_b.stock(), 8);
        assert_eq!(after_b.average_price(), 15.0);
    }

    #[tokio::test]
    async fn insert_sets_name_and_original_value() {
        let fx = Fixture::new();
        let p = fx.seed_product(SellerId::new(), "Cool Shirt").await;
        let v = fx.variants.insert_variant(&seller(), upload(&p, 12.5, 1)).await.unwrap();

        assert_eq!(v.name(), "cool-shirt___");
        assert_eq!(v.original_value(), 12.5);
        assert_eq!(fx.variants.get_variant(v.id_typed()).await.unwrap(), v);
    }

    #[tokio::test]
    async fn insert_for_unknown_product_is_not_found() {
        let fx = Fixture::new();
        let ghost = Product::restore(ProductId::new(), SellerId::new(), "Tee".into(), "Basic tee".into(), 0, 0.0);

        let err = fx.variants.insert_variant(&seller(), upload(&ghost, 1.0, 1)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));
        assert_eq!(fx.variant_count().await, 0);
    }

    #[tokio::test]
    async fn buyers_cannot_write_variants() {
        let fx = Fixture::new();
        let p = fx.seed_product(SellerId::new(), "Tee").await;
        let err = fx
            .variants
            .insert_variant(&Actor::Buyer(UserId::new()), upload(&p, 1.0, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn image_is_uploaded_under_timestamped_product_key() {
        let fx = Fixture::new();
        let p = fx.seed_product(SellerId::new(), "Tee").await;
        let mut input = upload(&p, 10.0, 1);
        input.image = Some(png_data_url());

        let v = fx.variants.insert_variant(&seller(), input).await.unwrap();

        let url = v.image().unwrap();
        let key = fx.storage.key_for_url(url).unwrap();
        assert!(key.ends_with(&format!("_{}", p.id_typed())));
        assert_eq!(fx.storage.get(&key).unwrap().content_type, "image/png");
    }

    #[tokio::test]
    async fn bad_image_is_rejected_before_any_write() {
        let fx = Fixture::new();
        let p = fx.seed_product(SellerId::new(), "Tee").await;
        let mut input = upload(&p, 10.0, 4);
        input.image = Some("data:application/pdf;base64,AAAA".to_string());

        let err = fx.variants.insert_variant(&seller(), input).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(e) if e.is_bad_request()));
        assert_eq!(fx.products.get_product(p.id_typed()).await.unwrap().stock(), 0);
        assert!(fx.storage.keys().is_empty());
    }

    #[tokio::test]
    async fn upload_failure_aborts_insert() {
        let fx = Fixture::with_failing_storage();
        let p = fx.seed_product(SellerId::new(), "Tee").await;
        let mut input = upload(&p, 10.0, 4);
        input.image = Some(png_data_url());

        let err = fx.variants.insert_variant(&seller(), input).await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
        assert_eq!(fx.products.get_product(p.id_typed()).await.unwrap().stock(), 0);
        assert_eq!(fx.variant_count().await, 0);
    }

    #[tokio::test]
    async fn stock_update_shifts_product_by_delta_only() {
        let fx = Fixture::new();
        let p = fx.seed_product(SellerId::new(), "Tee").await;
        let a = fx.variants.insert_variant(&seller(), upload(&p, 10.0, 5)).await.unwrap();
        fx.variants.insert_variant(&seller(), upload(&p, 20.0, 3)).await.unwrap();

        let update = VariantUpdate {
            patch: VariantPatch {
                stock: Some(9),
                value: Some(100.0),
                ..Default::default()
            },
            image: None,
        };
        let a = fx.variants.update_variant(&seller(), a.id_typed(), update).await.unwrap();

        assert_eq!(a.stock(), 9);
        assert_eq!(a.value(), 100.0);
        assert_eq!(a.original_value(), 10.0);
        let product = fx.products.get_product(p.id_typed()).await.unwrap();
        assert_eq!(product.stock(), 12);
        assert_eq!(product.average_price(), 15.0);
    }

    #[tokio::test]
    async fn setting_stock_to_zero_is_a_delta() {
        let fx = Fixture::new();
        let p = fx.seed_product(SellerId::new(), "Tee").await;
        let a = fx.variants.insert_variant(&seller(), upload(&p, 10.0, 5)).await.unwrap();

        let update = VariantUpdate {
            patch: VariantPatch {
                stock: Some(0),
                ..Default::default()
            },
            image: None,
        };
        fx.variants.update_variant(&seller(), a.id_typed(), update).await.unwrap();

        assert_eq!(fx.products.get_product(p.id_typed()).await.unwrap().stock(), 0);
    }

    #[tokio::test]
    async fn update_without_stock_leaves_product_alone() {
        let fx = Fixture::new();
        let p = fx.seed_product(SellerId::new(), "Tee").await;
        let a = fx.variants.insert_variant(&seller(), upload(&p, 10.0, 5)).await.unwrap();

        let update = VariantUpdate {
            patch: VariantPatch {
                company: Some("Globex".to_string()),
                ..Default::default()
            },
            image: None,
        };
        let a = fx.variants.update_variant(&seller(), a.id_typed(), update).await.unwrap();

        assert_eq!(a.company(), "Globex");
        assert_eq!(a.name(), "tee___");
        assert_eq!(fx.products.get_product(p.id_typed()).await.unwrap().stock(), 5);
    }

    #[tokio::test]
    async fn update_of_missing_variant_is_not_found_and_writes_nothing() {
        let fx = Fixture::new();
        let update = VariantUpdate {
            image: Some(png_data_url()),
            ..Default::default()
        };
        let err = fx
            .variants
            .update_variant(&seller(), VariantId::new(), update)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));
        assert!(fx.storage.keys().is_empty());
    }

    #[tokio::test]
    async fn image_replacement_deletes_previous_object() {
        let fx = Fixture::new();
        let p = fx.seed_product(SellerId::new(), "Tee").await;
        let mut input = upload(&p, 10.0, 1);
        input.image = Some(png_data_url());
        let v = fx.variants.insert_variant(&seller(), input).await.unwrap();
        let old_key = fx.storage.key_for_url(v.image().unwrap()).unwrap();

        // keys carry a millisecond timestamp
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let update = VariantUpdate {
            image: Some(png_data_url()),
            ..Default::default()
        };
        let v = fx.variants.update_variant(&seller(), v.id_typed(), update).await.unwrap();

        let new_key = fx.storage.key_for_url(v.image().unwrap()).unwrap();
        assert_ne!(old_key, new_key);
        assert_eq!(fx.storage.keys(), vec![new_key]);
    }

    #[tokio::test]
    async fn failed_image_delete_aborts_update() {
        let fx = Fixture::with_failing_deletes();
        let p = fx.seed_product(SellerId::new(), "Tee").await;
        let mut input = upload(&p, 10.0, 5);
        input.image = Some(png_data_url());
        let v = fx.variants.insert_variant(&seller(), input).await.unwrap();
        let old_url = v.image().unwrap().to_string();

        let update = VariantUpdate {
            patch: VariantPatch {
                stock: Some(9),
                ..Default::default()
            },
            image: Some(png_data_url()),
        };
        let err = fx
            .variants
            .update_variant(&seller(), v.id_typed(), update)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Storage(_)));
        assert_eq!(fx.products.get_product(p.id_typed()).await.unwrap().stock(), 5);
        let stored = fx.variants.get_variant(v.id_typed()).await.unwrap();
        assert_eq!(stored.image(), Some(old_url.as_str()));
        assert_eq!(stored.stock(), 5);
        assert_eq!(fx.storage.keys().len(), 1);
    }

    #[tokio::test]
    async fn stock_overflow_is_rejected_before_any_write() {
        let fx = Fixture::new();
        let p = fx.seed_product(SellerId::new(), "Tee").await;
        fx.variants.insert_variant(&seller(), upload(&p, 10.0, i64::MAX)).await.unwrap();

        let err = fx
            .variants
            .insert_variant(&seller(), upload(&p, 10.0, 1))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Domain(DomainError::InvariantViolation(_))));
        assert_eq!(fx.products.get_product(p.id_typed()).await.unwrap().stock(), i64::MAX);
        assert_eq!(fx.variant_count().await, 1);
    }

    #[tokio::test]
    async fn unscalable_price_is_a_bad_request() {
        let fx = Fixture::new();
        let p = fx.seed_product(SellerId::new(), "Tee").await;

        let err = fx
            .variants
            .insert_variant(&seller(), upload(&p, 1e308, 1))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Domain(e) if e.is_bad_request()));
        assert_eq!(fx.products.get_product(p.id_typed()).await.unwrap().average_price(), 0.0);
        assert_eq!(fx.variant_count().await, 0);
    }

    #[tokio::test]
    async fn delete_leaves_product_aggregates_untouched() {
        let fx = Fixture::new();
        let p = fx.seed_product(SellerId::new(), "Tee").await;
        let a = fx.variants.insert_variant(&seller(), upload(&p, 10.0, 5)).await.unwrap();

        fx.variants.delete_variant(&seller(), a.id_typed()).await.unwrap();

        assert!(fx.variants.get_variant(a.id_typed()).await.is_err());
        let product = fx.products.get_product(p.id_typed()).await.unwrap();
        assert_eq!(product.stock(), 5);
        assert_eq!(product.average_price(), 10.0);

        let err = fx.variants.delete_variant(&seller(), a.id_typed()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));
    }
}
