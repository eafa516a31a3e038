//! Coupon validation service
//!
//! The cart only consumes a [`CouponValidation`]; deciding whether a code is
//! usable happens here, behind [`CouponValidator`].

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::aggregates::{Coupon, CouponValidation, DiscountKind};
use crate::domain::value_objects::Rupees;
use crate::persistence::StorageError;
use crate::Result;

pub trait CouponValidator: Send + Sync {
    fn validate(&self, code: &str, cart_total: Rupees) -> CouponValidation;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponDefinition {
    pub code: String,
    #[serde(rename = "type")]
    pub kind: DiscountKind,
    pub value: i64,
    #[serde(default)]
    pub min_order: Option<Rupees>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "active_by_default")]
    pub active: bool,
}

fn active_by_default() -> bool { true }

impl CouponDefinition {
    pub fn new(code: impl Into<String>, kind: DiscountKind, value: i64) -> Self {
        Self { code: code.into(), kind, value, min_order: None, expires_at: None, active: true }
    }
    pub fn min_order(mut self, amount: i64) -> Self { self.min_order = Some(Rupees::new(amount)); self }
    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self { self.expires_at = Some(at); self }
    pub fn inactive(mut self) -> Self { self.active = false; self }
}

/// In-process coupon catalog, keyed by upper-cased code.
#[derive(Clone, Debug, Default)]
pub struct CouponBook {
    coupons: HashMap<String, CouponDefinition>,
}

impl CouponBook {
    pub fn new(definitions: impl IntoIterator<Item = CouponDefinition>) -> Self {
        let coupons = definitions.into_iter()
            .map(|mut d| { d.code = normalize(&d.code); (d.code.clone(), d) })
            .collect();
        Self { coupons }
    }

    /// Loads a JSON array of coupon definitions.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| StorageError::Io { path: path.to_path_buf(), source })?;
        let definitions: Vec<CouponDefinition> = serde_json::from_str(&raw).map_err(StorageError::from)?;
        info!(count = definitions.len(), path = %path.display(), "loaded coupons");
        Ok(Self::new(definitions))
    }

    pub fn len(&self) -> usize { self.coupons.len() }
    pub fn is_empty(&self) -> bool { self.coupons.is_empty() }

    pub fn validate_at(&self, code: &str, cart_total: Rupees, now: DateTime<Utc>) -> CouponValidation {
        let Some(def) = self.coupons.get(&normalize(code)).filter(|d| d.active) else {
            return CouponValidation::rejected("Invalid coupon code");
        };
        if def.expires_at.is_some_and(|at| at <= now) {
            return CouponValidation::rejected("Coupon expired");
        }
        if let Some(min) = def.min_order.filter(|min| cart_total < *min) {
            return CouponValidation::rejected(format!("Minimum order of {min} required"));
        }
        let coupon = Coupon { code: def.code.clone(), kind: def.kind, value: def.value };
        CouponValidation::accepted(coupon, "Coupon applied successfully")
    }
}

impl CouponValidator for CouponBook {
    fn validate(&self, code: &str, cart_total: Rupees) -> CouponValidation {
        self.validate_at(code, cart_total, Utc::now())
    }
}

fn normalize(code: &str) -> String { code.trim().to_uppercase() }
