//! Aggregates module
pub mod cart;
pub mod checkout;
pub mod coupon;

pub use cart::{AddItem, CartCommand, CartState, CartTotals, LineItem, PricingRules, ProductDescriptor};
pub use checkout::{CheckoutSummary, OrderDraft, OrderItem, PaymentMethod};
pub use coupon::{Coupon, CouponValidation, DiscountKind};
