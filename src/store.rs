//! Cart store: owns the current [`CartState`] and notifies observers after each command.
//!
//! The reducer stays pure; writing items back to storage is just another observer.

use tracing::{debug, error};

use crate::domain::aggregates::{AddItem, CartCommand, CartState, CouponValidation, PricingRules};
use crate::domain::events::CartEvent;
use crate::domain::value_objects::CartItemId;
use crate::persistence::{self, KeyValueStorage};

pub trait CartObserver: Send {
    fn on_change(&mut self, previous: &CartState, current: &CartState, events: &[CartEvent]);
}

/// Saves line items whenever a command changed them.
pub struct PersistItems<S> {
    storage: S,
}

impl<S: KeyValueStorage> PersistItems<S> {
    pub fn new(storage: S) -> Self { Self { storage } }
}

impl<S: KeyValueStorage> CartObserver for PersistItems<S> {
    fn on_change(&mut self, _previous: &CartState, current: &CartState, events: &[CartEvent]) {
        if !events.iter().any(CartEvent::changes_items) { return; }
        if let Err(e) = persistence::save_items(&mut self.storage, current.items()) {
            error!(error = %e, "failed to persist cart");
        }
    }
}

pub struct CartStore {
    state: CartState,
    rules: PricingRules,
    observers: Vec<Box<dyn CartObserver>>,
}

impl CartStore {
    /// Empty in-memory cart with no observers.
    pub fn new(rules: PricingRules) -> Self {
        Self { state: CartState::empty(), rules, observers: Vec::new() }
    }

    /// Restores items from `storage` and keeps it up to date from then on.
    pub fn open<S: KeyValueStorage + 'static>(storage: S, rules: PricingRules) -> Self {
        let items = persistence::load_items(&storage);
        let mut store = Self { state: CartState::from_items(items, &rules), rules, observers: Vec::new() };
        store.subscribe(PersistItems::new(storage));
        store
    }

    pub fn subscribe(&mut self, observer: impl CartObserver + 'static) { self.observers.push(Box::new(observer)); }
    pub fn state(&self) -> &CartState { &self.state }
    pub fn rules(&self) -> &PricingRules { &self.rules }

    pub fn dispatch(&mut self, command: CartCommand) -> &CartState {
        let name = command.name();
        let (next, events) = self.state.apply(command, &self.rules);
        debug!(command = name, events = events.len(), item_count = next.item_count(), final_total = %next.final_total(), "cart command applied");
        let previous = std::mem::replace(&mut self.state, next);
        if !events.is_empty() {
            for observer in &mut self.observers { observer.on_change(&previous, &self.state, &events); }
        }
        &self.state
    }

    pub fn add_item(&mut self, req: AddItem) -> &CartState { self.dispatch(CartCommand::AddItem(req)) }
    pub fn update_quantity(&mut self, cart_item_id: CartItemId, quantity: i64) -> &CartState {
        self.dispatch(CartCommand::UpdateQuantity { cart_item_id, quantity })
    }
    pub fn remove_item(&mut self, cart_item_id: CartItemId) -> &CartState { self.dispatch(CartCommand::RemoveItem(cart_item_id)) }
    pub fn apply_coupon(&mut self, validation: CouponValidation) -> &CartState { self.dispatch(CartCommand::ApplyCoupon(validation)) }
    pub fn clear(&mut self) -> &CartState { self.dispatch(CartCommand::ClearCart) }
}
