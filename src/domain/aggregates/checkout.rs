//! Checkout summary and order draft built from a cart

use serde::{Deserialize, Serialize};
use crate::domain::aggregates::cart::{CartState, LineItem, PricingRules};
use crate::domain::aggregates::coupon::Coupon;
use crate::domain::value_objects::Rupees;
use crate::{Result, StorefrontError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Upi,
    Razorpay,
    PhonePe,
    Cod,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSummary {
    pub subtotal: Rupees,
    pub discount_amount: Rupees,
    pub tax: Rupees,
    pub cod_charges: Rupees,
    pub shipping_fee: Rupees,
    pub total: Rupees,
}

impl CheckoutSummary {
    pub fn for_cart(cart: &CartState, method: PaymentMethod, rules: &PricingRules) -> Self {
        let totals = cart.totals();
        let cod_charges = if method == PaymentMethod::Cod { rules.cod_charge } else { Rupees::ZERO };
        // No GST is collected at checkout yet.
        let tax = Rupees::ZERO;
        let total = totals.subtotal
            .sub(totals.discount_amount)
            .add(totals.shipping_fee)
            .add(cod_charges)
            .add(tax)
            .non_negative();
        Self { subtotal: totals.subtotal, discount_amount: totals.discount_amount, tax, cod_charges, shipping_fee: totals.shipping_fee, total }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product: String,
    pub name: String,
    pub image: String,
    pub price: Rupees,
    pub quantity: u32,
    pub variant_id: Option<String>,
    pub size: Option<String>,
}

impl From<&LineItem> for OrderItem {
    fn from(i: &LineItem) -> Self {
        Self {
            product: i.product_id.clone(), name: i.name.clone(), image: i.image.clone(), price: i.price,
            quantity: i.quantity.value(), variant_id: i.variant_id.clone(), size: i.size.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub order_items: Vec<OrderItem>,
    #[serde(flatten)]
    pub summary: CheckoutSummary,
    pub applied_coupon: Option<Coupon>,
    pub payment_method: PaymentMethod,
}

impl OrderDraft {
    pub fn from_cart(cart: &CartState, method: PaymentMethod, rules: &PricingRules) -> Result<Self> {
        if cart.is_empty() { return Err(StorefrontError::EmptyCart); }
        Ok(Self {
            order_items: cart.items().iter().map(OrderItem::from).collect(),
            summary: CheckoutSummary::for_cart(cart, method, rules),
            applied_coupon: cart.applied_coupon().cloned(),
            payment_method: method,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::cart::{AddItem, CartCommand, ProductDescriptor};
    use crate::domain::aggregates::coupon::CouponValidation;

    fn cart_with(price: i64) -> CartState {
        let req = AddItem::new(ProductDescriptor::new("sesame", "Sesame Oil", price)).variant("1l").size("1 L");
        CartState::empty().apply(CartCommand::AddItem(req), &PricingRules::default()).0
    }

    #[test]
    fn test_cod_adds_surcharge() {
        let cart = cart_with(300);
        let upi = CheckoutSummary::for_cart(&cart, PaymentMethod::Upi, &PricingRules::default());
        let cod = CheckoutSummary::for_cart(&cart, PaymentMethod::Cod, &PricingRules::default());
        assert_eq!(upi.total.amount(), 399);
        assert_eq!(cod.cod_charges.amount(), 50);
        assert_eq!(cod.total.amount(), 449);
        assert_eq!(cod.tax, Rupees::ZERO);
    }

    #[test]
    fn test_summary_includes_discount() {
        let rules = PricingRules::default();
        let cart = cart_with(1000);
        let cart = cart.apply(CartCommand::ApplyCoupon(CouponValidation::accepted(Coupon::percent("OIL20", 20), "ok")), &rules).0;
        let s = CheckoutSummary::for_cart(&cart, PaymentMethod::Razorpay, &rules);
        assert_eq!((s.subtotal.amount(), s.discount_amount.amount(), s.shipping_fee.amount(), s.total.amount()), (1000, 200, 0, 800));
    }

    #[test]
    fn test_order_draft() {
        let draft = OrderDraft::from_cart(&cart_with(250), PaymentMethod::Cod, &PricingRules::default()).unwrap();
        assert_eq!(draft.order_items.len(), 1);
        assert_eq!(draft.order_items[0].variant_id.as_deref(), Some("1l"));
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["paymentMethod"], "cod");
        assert_eq!(json["codCharges"], 50);
        assert_eq!(json["orderItems"][0]["product"], "sesame");
    }

    #[test]
    fn test_order_draft_rejects_empty_cart() {
        let err = OrderDraft::from_cart(&CartState::empty(), PaymentMethod::Upi, &PricingRules::default());
        assert!(matches!(err, Err(StorefrontError::EmptyCart)));
    }
}
