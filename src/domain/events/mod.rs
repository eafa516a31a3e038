//! Cart events raised by the reducer
use crate::domain::value_objects::{CartItemId, Rupees};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartEvent {
    ItemAdded { cart_item_id: CartItemId, quantity: u32 },
    QuantityChanged { cart_item_id: CartItemId, quantity: u32 },
    ItemRemoved { cart_item_id: CartItemId },
    CouponApplied { code: String, discount: Rupees },
    CouponRejected { message: String },
    /// Coupon dropped because the cart emptied.
    CouponCleared { code: String },
    Cleared,
}

impl CartEvent {
    /// Whether the event touched the line items (and so needs persisting).
    pub fn changes_items(&self) -> bool {
        matches!(self, Self::ItemAdded { .. } | Self::QuantityChanged { .. } | Self::ItemRemoved { .. } | Self::Cleared)
    }
}
