//! Coupon descriptors and validation outcomes

use serde::{Deserialize, Serialize};
use crate::domain::value_objects::Rupees;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind { Flat, Percent }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    #[serde(rename = "type")]
    pub kind: DiscountKind,
    pub value: i64,
}

impl Coupon {
    pub fn flat(code: impl Into<String>, value: i64) -> Self { Self { code: code.into(), kind: DiscountKind::Flat, value } }
    pub fn percent(code: impl Into<String>, value: i64) -> Self { Self { code: code.into(), kind: DiscountKind::Percent, value } }

    /// Flat discounts are capped at the subtotal; percent discounts truncate.
    pub fn discount_for(&self, subtotal: Rupees) -> Rupees {
        let subtotal = subtotal.amount().max(0);
        let value = self.value.max(0);
        let amount = match self.kind {
            DiscountKind::Flat => value.min(subtotal),
            DiscountKind::Percent => subtotal.saturating_mul(value) / 100,
        };
        Rupees::new(amount)
    }

    pub fn applied_message(&self, discount: Rupees) -> String {
        format!("{} applied: {} OFF", self.code, discount)
    }
}

/// Result handed back by the coupon validation service.
///
/// On the wire this is `{ "success": bool, "coupon"?: {...}, "message"?: "..." }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CouponValidationWire", into = "CouponValidationWire")]
pub enum CouponValidation {
    Accepted { coupon: Coupon, message: Option<String> },
    Rejected { message: String },
}

impl CouponValidation {
    pub fn accepted(coupon: Coupon, message: impl Into<String>) -> Self {
        Self::Accepted { coupon, message: Some(message.into()) }
    }
    pub fn rejected(message: impl Into<String>) -> Self { Self::Rejected { message: message.into() } }
    pub fn is_success(&self) -> bool { matches!(self, Self::Accepted { .. }) }
    pub fn message(&self) -> &str {
        match self {
            Self::Accepted { message, .. } => message.as_deref().unwrap_or_default(),
            Self::Rejected { message } => message,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct CouponValidationWire {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    coupon: Option<Coupon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl From<CouponValidationWire> for CouponValidation {
    // A "success" with no coupon attached has nothing to discount.
    fn from(w: CouponValidationWire) -> Self {
        match (w.success, w.coupon) {
            (true, Some(coupon)) => Self::Accepted { coupon, message: w.message },
            _ => Self::Rejected { message: w.message.unwrap_or_default() },
        }
    }
}

impl From<CouponValidation> for CouponValidationWire {
    fn from(v: CouponValidation) -> Self {
        match v {
            CouponValidation::Accepted { coupon, message } => Self { success: true, coupon: Some(coupon), message },
            CouponValidation::Rejected { message } => Self { success: false, coupon: None, message: Some(message) },
        }
    }
}
