//! Cart Aggregate
//!
//! The cart is a value: every command produces a new [`CartState`] with its
//! totals derived from the line items and the applied coupon. Nothing here
//! performs I/O; persistence hangs off the events returned by [`CartState::apply`].

use serde::{Deserialize, Serialize};
use crate::domain::aggregates::coupon::{Coupon, CouponValidation};
use crate::domain::events::CartEvent;
use crate::domain::value_objects::{CartItemId, Quantity, Rupees};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub cart_item_id: CartItemId,
    #[serde(alias = "_id")]
    pub product_id: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub slug: String,
    pub price: Rupees,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    pub quantity: Quantity,
}

impl LineItem {
    pub fn line_total(&self) -> Rupees { self.price.multiply(self.quantity.value()) }
}

/// Catalog snapshot taken when a product is added. The price is not re-fetched later.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDescriptor {
    #[serde(alias = "_id", alias = "id")]
    pub product_id: String,
    pub name: String,
    pub price: Rupees,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub slug: String,
}

impl ProductDescriptor {
    pub fn new(product_id: impl Into<String>, name: impl Into<String>, price: i64) -> Self {
        Self { product_id: product_id.into(), name: name.into(), price: Rupees::new(price), image: String::new(), slug: String::new() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItem {
    #[serde(flatten)]
    pub product: ProductDescriptor,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub variant_id: Option<String>,
}

impl AddItem {
    pub fn new(product: ProductDescriptor) -> Self { Self { product, quantity: None, size: None, variant_id: None } }
    pub fn quantity(mut self, quantity: u32) -> Self { self.quantity = Some(quantity); self }
    pub fn size(mut self, size: impl Into<String>) -> Self { self.size = Some(size.into()); self }
    pub fn variant(mut self, variant_id: impl Into<String>) -> Self { self.variant_id = Some(variant_id.into()); self }
    pub fn cart_item_id(&self) -> CartItemId {
        CartItemId::for_product(&self.product.product_id, self.variant_id.as_deref())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartCommand {
    AddItem(AddItem),
    /// Sets (not increments) the quantity; zero or less removes the line.
    UpdateQuantity { cart_item_id: CartItemId, quantity: i64 },
    RemoveItem(CartItemId),
    ApplyCoupon(CouponValidation),
    ClearCart,
}

impl CartCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddItem(_) => "add_item",
            Self::UpdateQuantity { .. } => "update_quantity",
            Self::RemoveItem(_) => "remove_item",
            Self::ApplyCoupon(_) => "apply_coupon",
            Self::ClearCart => "clear_cart",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingRules {
    /// Shipping is free when the subtotal is strictly above this.
    pub free_shipping_above: Rupees,
    pub shipping_fee: Rupees,
    pub cod_charge: Rupees,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self { free_shipping_above: Rupees::new(499), shipping_fee: Rupees::new(99), cod_charge: Rupees::new(50) }
    }
}

impl PricingRules {
    pub fn shipping_for(&self, subtotal: Rupees, has_items: bool) -> Rupees {
        if !has_items || subtotal > self.free_shipping_above { Rupees::ZERO } else { self.shipping_fee }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub subtotal: Rupees,
    pub item_count: u64,
    pub shipping_fee: Rupees,
    pub discount_amount: Rupees,
    pub final_total: Rupees,
}

impl CartTotals {
    pub fn compute(items: &[LineItem], coupon: Option<&Coupon>, rules: &PricingRules) -> Self {
        let subtotal = items.iter().fold(Rupees::ZERO, |acc, i| acc.add(i.line_total()));
        let item_count = items.iter().map(|i| u64::from(i.quantity.value())).sum();
        let shipping_fee = rules.shipping_for(subtotal, !items.is_empty());
        let discount_amount = coupon.map(|c| c.discount_for(subtotal)).unwrap_or_default();
        let final_total = subtotal.add(shipping_fee).sub(discount_amount).non_negative();
        Self { subtotal, item_count, shipping_fee, discount_amount, final_total }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartState {
    items: Vec<LineItem>,
    applied_coupon: Option<Coupon>,
    #[serde(flatten)]
    totals: CartTotals,
    coupon_message: String,
}

impl CartState {
    pub fn empty() -> Self { Self::default() }

    /// Rebuilds a cart from stored line items. Coupons never survive a reload.
    pub fn from_items(stored: Vec<LineItem>, rules: &PricingRules) -> Self {
        let mut items: Vec<LineItem> = Vec::with_capacity(stored.len());
        for item in stored {
            match items.iter_mut().find(|i| i.cart_item_id == item.cart_item_id) {
                Some(existing) => existing.quantity = existing.quantity.add(item.quantity),
                None => items.push(item),
            }
        }
        Self::derive(items, None, rules)
    }

    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn item(&self, id: &CartItemId) -> Option<&LineItem> { self.items.iter().find(|i| &i.cart_item_id == id) }
    pub fn applied_coupon(&self) -> Option<&Coupon> { self.applied_coupon.as_ref() }
    pub fn totals(&self) -> &CartTotals { &self.totals }
    pub fn subtotal(&self) -> Rupees { self.totals.subtotal }
    pub fn item_count(&self) -> u64 { self.totals.item_count }
    pub fn shipping_fee(&self) -> Rupees { self.totals.shipping_fee }
    pub fn discount_amount(&self) -> Rupees { self.totals.discount_amount }
    pub fn final_total(&self) -> Rupees { self.totals.final_total }
    pub fn coupon_message(&self) -> &str { &self.coupon_message }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Pure transition: returns the next state and what happened, leaving `self` untouched.
    pub fn apply(&self, command: CartCommand, rules: &PricingRules) -> (CartState, Vec<CartEvent>) {
        let mut events = Vec::new();
        let next = match command {
            CartCommand::AddItem(req) => self.add_item(req, rules, &mut events),
            CartCommand::UpdateQuantity { cart_item_id, quantity } => self.update_quantity(cart_item_id, quantity, rules, &mut events),
            CartCommand::RemoveItem(cart_item_id) => self.remove_item(cart_item_id, rules, &mut events),
            CartCommand::ApplyCoupon(validation) => self.apply_coupon(validation, rules, &mut events),
            CartCommand::ClearCart => {
                events.push(CartEvent::Cleared);
                Self::empty()
            }
        };
        (next, events)
    }

    fn add_item(&self, req: AddItem, rules: &PricingRules, events: &mut Vec<CartEvent>) -> Self {
        let cart_item_id = req.cart_item_id();
        let requested = req.quantity.and_then(Quantity::new).unwrap_or(Quantity::ONE);
        let mut items = self.items.clone();
        let quantity = match items.iter_mut().find(|i| i.cart_item_id == cart_item_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.add(requested);
                existing.quantity
            }
            None => {
                items.push(LineItem {
                    cart_item_id: cart_item_id.clone(),
                    product_id: req.product.product_id,
                    name: req.product.name,
                    image: req.product.image,
                    slug: req.product.slug,
                    price: req.product.price,
                    size: req.size,
                    variant_id: req.variant_id,
                    quantity: requested,
                });
                requested
            }
        };
        events.push(CartEvent::ItemAdded { cart_item_id, quantity: quantity.value() });
        self.with_items(items, rules, events)
    }

    fn update_quantity(&self, id: CartItemId, quantity: i64, rules: &PricingRules, events: &mut Vec<CartEvent>) -> Self {
        if self.item(&id).is_none() { return self.clone(); }
        let Some(quantity) = Quantity::from_requested(quantity) else {
            return self.remove_item(id, rules, events);
        };
        let items = self.items.iter().cloned().map(|mut i| {
            if i.cart_item_id == id { i.quantity = quantity; }
            i
        }).collect();
        events.push(CartEvent::QuantityChanged { cart_item_id: id, quantity: quantity.value() });
        self.with_items(items, rules, events)
    }

    fn remove_item(&self, id: CartItemId, rules: &PricingRules, events: &mut Vec<CartEvent>) -> Self {
        if self.item(&id).is_none() { return self.clone(); }
        let items = self.items.iter().filter(|i| i.cart_item_id != id).cloned().collect();
        events.push(CartEvent::ItemRemoved { cart_item_id: id });
        self.with_items(items, rules, events)
    }

    fn apply_coupon(&self, validation: CouponValidation, rules: &PricingRules, events: &mut Vec<CartEvent>) -> Self {
        match validation {
            CouponValidation::Rejected { message } => {
                let mut next = Self::derive(self.items.clone(), None, rules);
                next.coupon_message = message.clone();
                events.push(CartEvent::CouponRejected { message });
                next
            }
            // Nothing to discount yet: keep the message, drop the coupon.
            CouponValidation::Accepted { message, .. } if self.is_empty() => {
                let mut next = Self::derive(Vec::new(), None, rules);
                next.coupon_message = message.unwrap_or_default();
                next
            }
            CouponValidation::Accepted { coupon, .. } => {
                let code = coupon.code.clone();
                let next = Self::derive(self.items.clone(), Some(coupon), rules);
                events.push(CartEvent::CouponApplied { code, discount: next.discount_amount() });
                next
            }
        }
    }

    /// Carries the coupon over unless the new item list is empty.
    fn with_items(&self, items: Vec<LineItem>, rules: &PricingRules, events: &mut Vec<CartEvent>) -> Self {
        let coupon = match (&self.applied_coupon, items.is_empty()) {
            (Some(c), true) => {
                events.push(CartEvent::CouponCleared { code: c.code.clone() });
                None
            }
            (coupon, false) => coupon.clone(),
            (None, true) => None,
        };
        Self::derive(items, coupon, rules)
    }

    fn derive(items: Vec<LineItem>, coupon: Option<Coupon>, rules: &PricingRules) -> Self {
        let totals = CartTotals::compute(&items, coupon.as_ref(), rules);
        let coupon_message = coupon.as_ref().map(|c| c.applied_message(totals.discount_amount)).unwrap_or_default();
        Self { items, applied_coupon: coupon, totals, coupon_message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> PricingRules { PricingRules::default() }
    fn oil(id: &str, price: i64) -> AddItem { AddItem::new(ProductDescriptor::new(id, format!("Oil {id}"), price)) }
    fn run(state: &CartState, cmd: CartCommand) -> CartState { state.apply(cmd, &rules()).0 }
    fn add(state: &CartState, req: AddItem) -> CartState { run(state, CartCommand::AddItem(req)) }
    fn accept(coupon: Coupon) -> CartCommand { CartCommand::ApplyCoupon(CouponValidation::accepted(coupon, "Coupon applied successfully")) }

    fn assert_consistent(cart: &CartState) {
        let subtotal: i64 = cart.items().iter().map(|i| i.price.amount() * i64::from(i.quantity.value())).sum();
        let count: u64 = cart.items().iter().map(|i| u64::from(i.quantity.value())).sum();
        assert_eq!(cart.subtotal().amount(), subtotal);
        assert_eq!(cart.item_count(), count);
        assert!(cart.final_total().amount() >= 0);
        if cart.is_empty() { assert!(cart.applied_coupon().is_none()); }
    }

    #[test]
    fn test_walkthrough() {
        let cart = add(&CartState::empty(), oil("A", 200));
        assert_eq!((cart.subtotal().amount(), cart.shipping_fee().amount(), cart.final_total().amount()), (200, 99, 299));

        let cart = add(&cart, oil("A", 200).quantity(2));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity.value(), 3);
        assert_eq!((cart.subtotal().amount(), cart.shipping_fee().amount(), cart.final_total().amount()), (600, 0, 600));

        let cart = run(&cart, accept(Coupon::flat("CODE50", 50)));
        assert_eq!(cart.discount_amount().amount(), 50);
        assert_eq!(cart.final_total().amount(), 550);
        assert_eq!(cart.coupon_message(), "CODE50 applied: ₹50 OFF");

        let cart = run(&cart, CartCommand::RemoveItem("A".into()));
        assert!(cart.is_empty());
        assert!(cart.applied_coupon().is_none());
        assert_eq!(cart.subtotal(), Rupees::ZERO);
        assert_eq!(cart.final_total(), Rupees::ZERO);
        assert_consistent(&cart);
    }

    #[test]
    fn test_repeated_adds_merge() {
        let mut cart = CartState::empty();
        for q in [1, 4, 2] { cart = add(&cart, oil("A", 10).quantity(q)); }
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity.value(), 7);
        assert_consistent(&cart);
    }

    #[test]
    fn test_variants_are_separate_lines() {
        let cart = add(&CartState::empty(), oil("A", 100).variant("1l").size("1 L"));
        let cart = add(&cart, oil("A", 60).variant("500ml").size("500 ml"));
        let cart = add(&cart, oil("B", 30));
        let ids: Vec<_> = cart.items().iter().map(|i| i.cart_item_id.as_str().to_string()).collect();
        assert_eq!(ids, ["A-1l", "A-500ml", "B"]);
        assert_eq!(cart.items()[1].size.as_deref(), Some("500 ml"));
        assert_consistent(&cart);
    }

    #[test]
    fn test_zero_or_missing_add_quantity_defaults_to_one() {
        let cart = add(&CartState::empty(), oil("A", 10).quantity(0));
        assert_eq!(cart.items()[0].quantity.value(), 1);
        assert_eq!(cart.items()[0].size, None);
    }

    #[test]
    fn test_shipping_threshold() {
        let at = add(&CartState::empty(), oil("A", 499));
        assert_eq!(at.shipping_fee().amount(), 99);
        let above = add(&CartState::empty(), oil("A", 500));
        assert_eq!(above.shipping_fee().amount(), 0);
    }

    #[test]
    fn test_update_quantity_sets_value() {
        let cart = add(&CartState::empty(), oil("A", 100).quantity(5));
        let cart = run(&cart, CartCommand::UpdateQuantity { cart_item_id: "A".into(), quantity: 2 });
        assert_eq!(cart.items()[0].quantity.value(), 2);
        assert_eq!(cart.subtotal().amount(), 200);
    }

    #[test]
    fn test_update_to_zero_removes_and_clears_coupon() {
        let cart = add(&CartState::empty(), oil("A", 300));
        let cart = run(&cart, accept(Coupon::percent("TEN", 10)));
        assert!(cart.applied_coupon().is_some());
        let (cart, events) = cart.apply(CartCommand::UpdateQuantity { cart_item_id: "A".into(), quantity: 0 }, &rules());
        assert!(cart.is_empty());
        assert!(cart.applied_coupon().is_none());
        assert_eq!(cart.coupon_message(), "");
        assert!(events.contains(&CartEvent::CouponCleared { code: "TEN".into() }));
        assert_consistent(&cart);
    }

    #[test]
    fn test_negative_quantity_removes() {
        let cart = add(&add(&CartState::empty(), oil("A", 10)), oil("B", 20));
        let cart = run(&cart, CartCommand::UpdateQuantity { cart_item_id: "A".into(), quantity: -1 });
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].product_id, "B");
    }

    #[test]
    fn test_oversized_quantity_saturates() {
        let cart = add(&CartState::empty(), oil("A", 1));
        let cart = run(&cart, CartCommand::UpdateQuantity { cart_item_id: "A".into(), quantity: 5_000_000_000 });
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity.value(), u32::MAX);
        assert_eq!(cart.item_count(), u64::from(u32::MAX));
        assert_consistent(&cart);
    }

    #[test]
    fn test_unknown_item_is_noop() {
        let cart = run(&add(&CartState::empty(), oil("A", 10)), accept(Coupon::flat("F5", 5)));
        let (after_update, events) = cart.apply(CartCommand::UpdateQuantity { cart_item_id: "nope".into(), quantity: 3 }, &rules());
        assert_eq!(after_update, cart);
        assert!(events.is_empty());
        let (after_remove, events) = cart.apply(CartCommand::RemoveItem("nope".into()), &rules());
        assert_eq!(after_remove, cart);
        assert!(events.is_empty());
    }

    #[test]
    fn test_coupon_survives_non_emptying_changes() {
        let cart = add(&add(&CartState::empty(), oil("A", 400)), oil("B", 200));
        let cart = run(&cart, accept(Coupon::percent("TEN", 10)));
        assert_eq!(cart.discount_amount().amount(), 60);
        let cart = run(&cart, CartCommand::RemoveItem("A".into()));
        assert_eq!(cart.applied_coupon().map(|c| c.code.as_str()), Some("TEN"));
        assert_eq!(cart.discount_amount().amount(), 20);
        assert_eq!(cart.coupon_message(), "TEN applied: ₹20 OFF");
        assert_eq!(cart.final_total().amount(), 200 + 99 - 20);
    }

    #[test]
    fn test_rejected_coupon_removes_existing() {
        let cart = run(&add(&CartState::empty(), oil("A", 600)), accept(Coupon::flat("F100", 100)));
        let cart = run(&cart, CartCommand::ApplyCoupon(CouponValidation::rejected("Coupon expired")));
        assert!(cart.applied_coupon().is_none());
        assert_eq!(cart.discount_amount(), Rupees::ZERO);
        assert_eq!(cart.coupon_message(), "Coupon expired");
        assert_eq!(cart.final_total().amount(), 600);
    }

    #[test]
    fn test_coupon_not_attached_to_empty_cart() {
        let cart = run(&CartState::empty(), accept(Coupon::flat("F100", 100)));
        assert!(cart.applied_coupon().is_none());
        assert_eq!(cart.discount_amount(), Rupees::ZERO);
        assert_eq!(cart.coupon_message(), "Coupon applied successfully");
        let cart = add(&cart, oil("A", 300));
        assert!(cart.applied_coupon().is_none());
        assert_eq!(cart.final_total().amount(), 399);
    }

    #[test]
    fn test_cleared_coupon_not_resurrected() {
        let cart = run(&add(&CartState::empty(), oil("A", 300)), accept(Coupon::flat("F100", 100)));
        let cart = run(&cart, CartCommand::RemoveItem("A".into()));
        let cart = add(&cart, oil("A", 300));
        assert!(cart.applied_coupon().is_none());
        assert_eq!(cart.discount_amount(), Rupees::ZERO);
    }

    #[test]
    fn test_flat_coupon_never_exceeds_subtotal() {
        let cart = run(&add(&CartState::empty(), oil("A", 40)), accept(Coupon::flat("HUGE", 5000)));
        assert_eq!(cart.discount_amount().amount(), 40);
        assert_eq!(cart.final_total().amount(), 99);
    }

    #[test]
    fn test_final_total_floored_at_zero() {
        let cart = run(&add(&CartState::empty(), oil("A", 100)), accept(Coupon::percent("FREE", 250)));
        assert_eq!(cart.discount_amount().amount(), 250);
        assert_eq!(cart.final_total(), Rupees::ZERO);
    }

    #[test]
    fn test_percent_coupon_floor() {
        let cart = run(&add(&CartState::empty(), oil("A", 333)), accept(Coupon::percent("P15", 15)));
        assert_eq!(cart.discount_amount().amount(), 49);
    }

    #[test]
    fn test_clear_cart_resets_everything() {
        let cart = run(&add(&CartState::empty(), oil("A", 300)), accept(Coupon::flat("F10", 10)));
        let (cart, events) = cart.apply(CartCommand::ClearCart, &rules());
        assert_eq!(cart, CartState::empty());
        assert_eq!(events, vec![CartEvent::Cleared]);
    }

    #[test]
    fn test_apply_does_not_mutate_input() {
        let before = add(&CartState::empty(), oil("A", 100));
        let snapshot = before.clone();
        let _ = before.apply(CartCommand::AddItem(oil("A", 100)), &rules());
        let _ = before.apply(CartCommand::ClearCart, &rules());
        assert_eq!(before, snapshot);
    }

    #[test]
    fn test_from_items_merges_duplicates_and_drops_coupon() {
        let item = add(&CartState::empty(), oil("A", 100).quantity(2)).items()[0].clone();
        let cart = CartState::from_items(vec![item.clone(), item], &rules());
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 4);
        assert!(cart.applied_coupon().is_none());
    }

    #[test]
    fn test_add_item_accepts_catalog_id_aliases() {
        let req: AddItem = serde_json::from_value(serde_json::json!({
            "_id": "665f", "name": "Groundnut Oil", "price": 350, "image": "/g.jpg", "slug": "groundnut-oil", "variantId": "1l"
        })).unwrap();
        assert_eq!(req.cart_item_id().as_str(), "665f-1l");
        assert_eq!(req.quantity, None);
    }
}
