use serde::{Deserialize, Serialize};

use gbau_core::{DomainError, Entity, MAX_PRICE, ProductId, VariantId};

use crate::Product;

const TEXT_LEN: core::ops::RangeInclusive<usize> = 1..=255;

/// Catalog colors a variant may be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Color {
    Red,
    Blue,
    Green,
    Yellow,
    Black,
    White,
    Pink,
    Purple,
    Orange,
    Brown,
    Gray,
    Gold,
    Silver,
    Multicolor,
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Red => "RED",
            Color::Blue => "BLUE",
            Color::Green => "GREEN",
            Color::Yellow => "YELLOW",
            Color::Black => "BLACK",
            Color::White => "WHITE",
            Color::Pink => "PINK",
            Color::Purple => "PURPLE",
            Color::Orange => "ORANGE",
            Color::Brown => "BROWN",
            Color::Gray => "GRAY",
            Color::Gold => "GOLD",
            Color::Silver => "SILVER",
            Color::Multicolor => "MULTICOLOR",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        ALL_COLORS
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown color '{s}'")))
    }
}

const ALL_COLORS: [Color; 14] = [
    Color::Red,
    Color::Blue,
    Color::Green,
    Color::Yellow,
    Color::Black,
    Color::White,
    Color::Pink,
    Color::Purple,
    Color::Orange,
    Color::Brown,
    Color::Gray,
    Color::Gold,
    Color::Silver,
    Color::Multicolor,
];

/// Garment sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Size {
    #[serde(rename = "XS")]
    Xs,
    S,
    M,
    L,
    #[serde(rename = "XL")]
    Xl,
    #[serde(rename = "XXL")]
    Xxl,
}

impl Size {
    pub fn as_str(&self) -> &'static str {
        match self {
            Size::Xs => "XS",
            Size::S => "S",
            Size::M => "M",
            Size::L => "L",
            Size::Xl => "XL",
            Size::Xxl => "XXL",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "XS" => Ok(Size::Xs),
            "S" => Ok(Size::S),
            "M" => Ok(Size::M),
            "L" => Ok(Size::L),
            "XL" => Ok(Size::Xl),
            "XXL" => Ok(Size::Xxl),
            other => Err(DomainError::validation(format!("unknown size '{other}'"))),
        }
    }
}

/// Optional descriptive attributes shared by create and update inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantAttributes {
    #[serde(default)]
    pub color: Option<Vec<Color>>,
    #[serde(default)]
    pub design: Option<String>,
    #[serde(default)]
    pub size: Option<Size>,
    #[serde(default)]
    pub capacity: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
}

/// Input: add a variant to a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVariant {
    pub product_id: ProductId,
    pub company: String,
    pub stock: i64,
    pub value: f64,
    #[serde(flatten)]
    pub attributes: VariantAttributes,
}

/// Input: partial update of a variant. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantPatch {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(flatten)]
    pub attributes: VariantAttributes,
}

impl NewVariant {
    /// Field rules, checked independently of the owning product.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_text("company", &self.company)?;
        validate_stock(self.stock)?;
        validate_price("value", self.value)?;
        validate_attributes(&self.attributes)
    }
}

impl VariantPatch {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(company) = &self.company {
            validate_text("company", company)?;
        }
        if let Some(stock) = self.stock {
            validate_stock(stock)?;
        }
        if let Some(value) = self.value {
            validate_price("value", value)?;
        }
        validate_attributes(&self.attributes)
    }
}

/// A purchasable SKU of a product.
///
/// `name` is derived once at creation and is used to match rows on re-import;
/// `original_value` records the price at creation and never changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variant {
    id: VariantId,
    product_id: ProductId,
    name: String,
    company: String,
    stock: i64,
    value: f64,
    original_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<Vec<Color>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    design: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<Size>,
    #[serde(skip_serializing_if = "Option::is_none")]
    capacity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
}

/// Derive the import-matching name of a variant.
///
/// `<title lowercased, trimmed, spaces as '-'>_<colors joined by ','>_<size>_<capacity>`;
/// absent attributes leave their segment empty.
pub fn variant_name(
    product_title: &str,
    color: Option<&[Color]>,
    size: Option<Size>,
    capacity: Option<&str>,
) -> String {
    let title = product_title.to_lowercase().trim().replace(' ', "-");
    let color = color
        .map(|colors| colors.iter().map(Color::as_str).collect::<Vec<_>>().join(","))
        .unwrap_or_default();
    let size = size.map(|s| s.as_str()).unwrap_or_default();
    let capacity = capacity.unwrap_or_default();

    format!("{title}_{color}_{size}_{capacity}")
}

impl Variant {
    /// Build a new variant of `product`.
    ///
    /// The caller is responsible for folding the variant into the product's
    /// derived fields (see `gbau-inventory`).
    pub fn create(
        id: VariantId,
        product: &Product,
        input: NewVariant,
        image: Option<String>,
    ) -> Result<Self, DomainError> {
        if input.product_id != product.id_typed() {
            return Err(DomainError::invariant("variant input does not belong to this product"));
        }
        input.validate()?;

        let VariantAttributes {
            color,
            design,
            size,
            capacity,
            weight,
        } = input.attributes;

        let name = variant_name(product.title(), color.as_deref(), size, capacity.as_deref());

        Ok(Self {
            id,
            product_id: product.id_typed(),
            name,
            company: input.company,
            stock: input.stock,
            value: input.value,
            original_value: input.value,
            color,
            design,
            size,
            capacity,
            weight,
            image,
        })
    }

    /// Rebuild a variant from persisted state.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: VariantId,
        product_id: ProductId,
        name: String,
        company: String,
        stock: i64,
        value: f64,
        original_value: f64,
        attributes: VariantAttributes,
        image: Option<String>,
    ) -> Self {
        Self {
            id,
            product_id,
            name,
            company,
            stock,
            value,
            original_value,
            color: attributes.color,
            design: attributes.design,
            size: attributes.size,
            capacity: attributes.capacity,
            weight: attributes.weight,
            image,
        }
    }

    pub fn id_typed(&self) -> VariantId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn original_value(&self) -> f64 {
        self.original_value
    }

    pub fn color(&self) -> Option<&[Color]> {
        self.color.as_deref()
    }

    pub fn design(&self) -> Option<&str> {
        self.design.as_deref()
    }

    pub fn size(&self) -> Option<Size> {
        self.size
    }

    pub fn capacity(&self) -> Option<&str> {
        self.capacity.as_deref()
    }

    pub fn weight(&self) -> Option<f64> {
        self.weight
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn attributes(&self) -> VariantAttributes {
        VariantAttributes {
            color: self.color.clone(),
            design: self.design.clone(),
            size: self.size,
            capacity: self.capacity.clone(),
            weight: self.weight,
        }
    }

    /// Merge a partial update. `name` and `original_value` are never touched.
    ///
    /// Validation happens before any field changes.
    pub fn apply_patch(&mut self, patch: VariantPatch) -> Result<(), DomainError> {
        patch.validate()?;

        let VariantPatch {
            company,
            stock,
            value,
            attributes,
        } = patch;

        if let Some(company) = company {
            self.company = company;
        }
        if let Some(stock) = stock {
            self.stock = stock;
        }
        if let Some(value) = value {
            self.value = value;
        }
        if attributes.color.is_some() {
            self.color = attributes.color;
        }
        if attributes.design.is_some() {
            self.design = attributes.design;
        }
        if attributes.size.is_some() {
            self.size = attributes.size;
        }
        if attributes.capacity.is_some() {
            self.capacity = attributes.capacity;
        }
        if attributes.weight.is_some() {
            self.weight = attributes.weight;
        }
        Ok(())
    }

    pub fn set_image(&mut self, image: Option<String>) {
        self.image = image;
    }

    /// Take `quantity` units out of stock.
    ///
    /// Availability is not checked; stock can go negative under oversell.
    pub fn consume(&mut self, quantity: i64) -> Result<(), DomainError> {
        self.stock = self
            .stock
            .checked_sub(quantity)
            .ok_or_else(|| DomainError::invariant("variant stock out of range"))?;
        Ok(())
    }
}

impl Entity for Variant {
    type Id = VariantId;
    const KIND: &'static str = "Variant";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn validate_text(field: &str, value: &str) -> Result<(), DomainError> {
    if !TEXT_LEN.contains(&value.chars().count()) {
        return Err(DomainError::validation(format!(
            "{field} must be between 1 and 255 characters"
        )));
    }
    Ok(())
}

fn validate_stock(stock: i64) -> Result<(), DomainError> {
    if stock < 0 {
        return Err(DomainError::validation("stock must not be negative"));
    }
    Ok(())
}

fn validate_price(field: &str, value: f64) -> Result<(), DomainError> {
    if !value.is_finite() || value < 0.0 {
        return Err(DomainError::validation(format!(
            "{field} must be a non-negative number"
        )));
    }
    if value > MAX_PRICE {
        return Err(DomainError::validation(format!("{field} must not exceed {MAX_PRICE}")));
    }
    Ok(())
}

fn validate_attributes(attributes: &VariantAttributes) -> Result<(), DomainError> {
    if let Some(design) = &attributes.design {
        validate_text("design", design)?;
    }
    if let Some(weight) = attributes.weight {
        validate_price("weight", weight)?;
    }
    Ok(())
}
