use serde::{Deserialize, Serialize};

use gbau_core::{DomainError, Entity, ProductId, SellerId};

const TITLE_LEN: core::ops::RangeInclusive<usize> = 2..=30;
const DESCRIPTION_LEN: core::ops::RangeInclusive<usize> = 5..=100;

/// Aggregate root: Product.
///
/// `stock` and `average_price` are derived from the product's variants and are
/// never taken from client input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    id: ProductId,
    seller_id: SellerId,
    title: String,
    description: String,
    stock: i64,
    average_price: f64,
}

/// Input: create a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
}

/// Input: edit the descriptive fields of a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEdit {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl Product {
    /// Create a product owned by `seller_id`, with no stock and no price yet.
    pub fn create(id: ProductId, seller_id: SellerId, input: NewProduct) -> Result<Self, DomainError> {
        validate_title(&input.title)?;
        validate_description(&input.description)?;

        Ok(Self {
            id,
            seller_id,
            title: input.title,
            description: input.description,
            stock: 0,
            average_price: 0.0,
        })
    }

    /// Rebuild a product from persisted state.
    pub fn restore(
        id: ProductId,
        seller_id: SellerId,
        title: String,
        description: String,
        stock: i64,
        average_price: f64,
    ) -> Self {
        Self {
            id,
            seller_id,
            title,
            description,
            stock,
            average_price,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn seller_id(&self) -> SellerId {
        self.seller_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn average_price(&self) -> f64 {
        self.average_price
    }

    /// Apply a catalog edit. Derived fields are untouched.
    pub fn edit(&mut self, edit: CatalogEdit) -> Result<(), DomainError> {
        if let Some(title) = &edit.title {
            validate_title(title)?;
        }
        if let Some(description) = &edit.description {
            validate_description(description)?;
        }

        if let Some(title) = edit.title {
            self.title = title;
        }
        if let Some(description) = edit.description {
            self.description = description;
        }
        Ok(())
    }

    /// Shift the stock total by `delta` units.
    pub fn adjust_stock(&mut self, delta: i64) -> Result<(), DomainError> {
        self.stock = self
            .stock
            .checked_add(delta)
            .ok_or_else(|| DomainError::invariant("product stock out of range"))?;
        Ok(())
    }

    pub fn set_average_price(&mut self, average_price: f64) -> Result<(), DomainError> {
        if !average_price.is_finite() || average_price < 0.0 {
            return Err(DomainError::invariant("average price must be a non-negative number"));
        }
        self.average_price = average_price;
        Ok(())
    }
}

impl Entity for Product {
    type Id = ProductId;
    const KIND: &'static str = "Product";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn validate_title(title: &str) -> Result<(), DomainError> {
    if !TITLE_LEN.contains(&title.chars().count()) {
        return Err(DomainError::validation("title must be between 2 and 30 characters"));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), DomainError> {
    if !DESCRIPTION_LEN.contains(&description.chars().count()) {
        return Err(DomainError::validation(
            "description must be between 5 and 100 characters",
        ));
    }
    Ok(())
}
