use std::sync::Arc;

use tracing::{info, instrument};

use gbau_auth::{Actor, ensure_product_owner, require_seller};
use gbau_core::{Entity, PageRequest, ProductId};
use gbau_products::{CatalogEdit, NewProduct, Product};

use super::{Listing, Paging, ServiceResult};
use crate::repository::{ProductRepository, VariantRepository};

pub struct ProductService {
    products: Arc<dyn ProductRepository>,
    variants: Arc<dyn VariantRepository>,
    paging: Paging,
}

impl ProductService {
    pub fn new(products: Arc<dyn ProductRepository>, variants: Arc<dyn VariantRepository>, paging: Paging) -> Self {
        Self {
            products,
            variants,
            paging,
        }
    }

    pub async fn list_products(&self, page: PageRequest) -> ServiceResult<Listing<Product>> {
        let total = self.products.count().await?;
        let (links, slice) = self.paging.plan("products", page, total)?;
        let items = self.products.list(slice).await?;
        Ok(Listing::new(items, links))
    }

    pub async fn get_product(&self, id: ProductId) -> ServiceResult<Product> {
        self.products
            .get(id)
            .await?
            .ok_or_else(|| Product::not_found(&id).into())
    }

    /// Create a product for the acting seller. Stock and average price start at zero.
    #[instrument(skip(self, input), fields(actor = %actor), err)]
    pub async fn insert_product(&self, actor: &Actor, input: NewProduct) -> ServiceResult<Product> {
        let seller_id = require_seller(actor)?;
        let product = Product::create(ProductId::new(), seller_id, input)?;
        self.products.save(&product).await?;

        info!(product_id = %product.id_typed(), "product created");
        Ok(product)
    }

    /// Edit title/description. Only the owning seller or an admin may do this.
    #[instrument(skip(self, edit), fields(actor = %actor, product_id = %id), err)]
    pub async fn update_product(&self, actor: &Actor, id: ProductId, edit: CatalogEdit) -> ServiceResult<Product> {
        let mut product = self.get_product(id).await?;
        ensure_product_owner(actor, product.seller_id())?;

        product.edit(edit)?;
        self.products.save(&product).await?;
        Ok(product)
    }

    /// Delete a product and every variant it has.
    #[instrument(skip(self), fields(actor = %actor, product_id = %id), err)]
    pub async fn remove_product(&self, actor: &Actor, id: ProductId) -> ServiceResult<String> {
        let product = self.get_product(id).await?;
        ensure_product_owner(actor, product.seller_id())?;

        let removed_variants = self.variants.delete_for_product(id).await?;
        if !self.products.delete(id).await? {
            return Err(Product::not_found(&id).into());
        }

        info!(removed_variants, "product removed");
        Ok(format!("Product with id {id} was removed."))
    }
}
