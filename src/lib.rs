//! Woodpress Storefront
//!
//! Cart engine and checkout pricing for a wood-pressed oils and wellness store.
//!
//! ## Features
//! - Line items keyed by product and variant, merged on add
//! - Derived totals: subtotal, free-shipping threshold, coupon discount
//! - Flat and percent coupons, dropped when the cart empties
//! - Checkout summary with cash-on-delivery surcharge
//! - Items persisted to key-value storage after every change

use thiserror::Error;

pub mod api;
pub mod config;
pub mod coupons;
pub mod domain;
pub mod persistence;
pub mod store;

pub use domain::aggregates::{
    AddItem, CartCommand, CartState, CartTotals, CheckoutSummary, Coupon, CouponValidation, DiscountKind,
    LineItem, OrderDraft, PaymentMethod, PricingRules, ProductDescriptor,
};
pub use domain::events::CartEvent;
pub use domain::value_objects::{CartItemId, Quantity, Rupees};
pub use store::{CartObserver, CartStore};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Storage error: {0}")]
    Storage(#[from] persistence::StorageError),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
