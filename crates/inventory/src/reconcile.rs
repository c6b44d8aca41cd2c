use gbau_core::{DomainError, round2};
use gbau_products::{Product, Variant, VariantPatch};

/// Unweighted mean of the sibling unit prices plus the new one, to two decimals.
///
/// Stock levels play no part: a variant with one unit counts as much as one
/// with a thousand.
pub fn average_price<I>(sibling_values: I, new_value: f64) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = sibling_values
        .into_iter()
        .fold((0.0_f64, 0_u32), |(sum, count), v| (sum + v, count + 1));
    round2((sum + new_value) / f64::from(count + 1))
}

/// Fold a freshly created variant into its product.
///
/// `siblings` are the variants the product already had; the new variant must
/// not be among them. Stock is accumulated, the average price recomputed from
/// scratch.
pub fn fold_new_variant(
    product: &mut Product,
    siblings: &[Variant],
    variant: &Variant,
) -> Result<(), DomainError> {
    let product_id = product.id_typed();
    if variant.product_id() != product_id {
        return Err(DomainError::invariant("variant does not belong to product"));
    }
    if siblings
        .iter()
        .any(|s| s.product_id() != product_id || s.id_typed() == variant.id_typed())
    {
        return Err(DomainError::invariant(
            "sibling list must hold only other variants of the same product",
        ));
    }

    let average = average_price(siblings.iter().map(Variant::value), variant.value());
    product.adjust_stock(variant.stock())?;
    product.set_average_price(average)
}

/// Stock change implied by `patch`, if it carries a stock value.
///
/// A patch that sets stock to its current value yields `Some(0)`. Fails when the
/// difference does not fit in an `i64` (an oversold variant patched to a huge stock).
pub fn stock_delta(current: &Variant, patch: &VariantPatch) -> Result<Option<i64>, DomainError> {
    patch
        .stock
        .map(|new_stock| {
            new_stock
                .checked_sub(current.stock())
                .ok_or_else(|| DomainError::invariant("stock change out of range"))
        })
        .transpose()
}

/// Take sold units out of a variant.
pub fn sell_from_variant(variant: &mut Variant, quantity: i64) -> Result<(), DomainError> {
    ensure_positive(quantity)?;
    variant.consume(quantity)
}

/// Take sold units out of a product's stock total.
pub fn sell_from_product(product: &mut Product, quantity: i64) -> Result<(), DomainError> {
    ensure_positive(quantity)?;
    product.adjust_stock(-quantity)
}

fn ensure_positive(quantity: i64) -> Result<(), DomainError> {
    if quantity <= 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    Ok(())
}
