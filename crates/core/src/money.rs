//! Monetary rounding.
//!
//! Prices are kept as `f64` currency units (not cents); every derived price is
//! rounded to two decimals at the moment it is computed and stored as-is.

/// Largest unit price or weight accepted from clients.
pub const MAX_PRICE: f64 = 1e12;

/// Round to two decimal places, halves away from zero.
///
/// Values too large to scale by 100 carry no cents and are returned unchanged.
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / 100.0
}
