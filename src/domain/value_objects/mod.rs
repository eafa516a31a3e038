//! Value Objects for the storefront cart

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whole-rupee amount. Prices are snapshotted as integers, no paise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rupees(i64);

impl Rupees {
    pub const ZERO: Rupees = Rupees(0);
    pub const fn new(amount: i64) -> Self { Self(amount) }
    pub fn amount(&self) -> i64 { self.0 }
    pub fn add(&self, other: Rupees) -> Rupees { Rupees(self.0.saturating_add(other.0)) }
    pub fn sub(&self, other: Rupees) -> Rupees { Rupees(self.0.saturating_sub(other.0)) }
    pub fn multiply(&self, qty: u32) -> Rupees { Rupees(self.0.saturating_mul(i64::from(qty))) }
    /// Floors at zero.
    pub fn non_negative(&self) -> Rupees { Rupees(self.0.max(0)) }
}

impl fmt::Display for Rupees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "₹{}", self.0) }
}

/// Line identity: `productId`, or `productId-variantId` when a variant is chosen.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartItemId(String);

impl CartItemId {
    pub fn for_product(product_id: &str, variant_id: Option<&str>) -> Self {
        match variant_id.filter(|v| !v.is_empty()) {
            Some(variant) => Self(format!("{product_id}-{variant}")),
            None => Self(product_id.to_string()),
        }
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for CartItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl From<&str> for CartItemId { fn from(v: &str) -> Self { Self(v.to_string()) } }
impl From<String> for CartItemId { fn from(v: String) -> Self { Self(v) } }

/// Line quantity, never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);
    pub fn new(value: u32) -> Option<Self> { (value > 0).then_some(Self(value)) }
    /// `None` for a requested quantity of zero or less; larger requests saturate at `u32::MAX`.
    pub fn from_requested(value: i64) -> Option<Self> {
        if value <= 0 { return None; }
        Some(Self(u32::try_from(value).unwrap_or(u32::MAX)))
    }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: Quantity) -> Self { Self(self.0.saturating_add(other.0)) }
}

impl Default for Quantity { fn default() -> Self { Self::ONE } }

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;
    fn try_from(v: u32) -> Result<Self, Self::Error> { Self::new(v).ok_or(QuantityError::Zero) }
}

impl From<Quantity> for u32 { fn from(q: Quantity) -> Self { q.0 } }

#[derive(Debug, Clone)] pub enum QuantityError { Zero }
impl std::error::Error for QuantityError {}
impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "quantity must be at least 1") }
}
