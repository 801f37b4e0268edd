//! Cart store

use rusty_money::{Money, iso::Currency};
use tracing::{debug, warn};

use crate::{
    cart::{CartItem, CartPersistence, CartSnapshot, CartState},
    pricing::{PricingError, subtotal},
    products::Product,
    uuids::ProductUuid,
};

/// Single source of truth for the cart.
///
/// Every state change is applied in memory first and then mirrored to the persistence
/// adapter. A failed save is logged and otherwise ignored: the in-memory state stays
/// authoritative.
#[derive(Debug)]
pub struct CartStore<'a, P> {
    state: CartState<'a>,
    persistence: P,
    currency: &'static Currency,
}

impl<'a, P: CartPersistence> CartStore<'a, P> {
    /// Restore the last persisted cart, or start empty.
    ///
    /// A snapshot that cannot be read, or that was recorded in another currency, is
    /// discarded with a warning.
    pub fn restore(persistence: P, currency: &'static Currency) -> Self {
        let state = match persistence.load() {
            Ok(Some(snapshot)) => match snapshot.restore(currency) {
                Ok(state) => state,
                Err(error) => {
                    warn!(%error, "discarding persisted cart");
                    CartState::default()
                }
            },
            Ok(None) => CartState::default(),
            Err(error) => {
                warn!(%error, "failed to load persisted cart, starting empty");
                CartState::default()
            }
        };

        debug!(items = state.items().len(), "cart restored");

        Self {
            state,
            persistence,
            currency,
        }
    }

    /// Add one unit of `product`, appending a new line if it is not in the cart yet.
    pub fn add_item(&mut self, product: Product<'a>) {
        match self.state.position(product.uuid) {
            Some(index) => {
                if let Some(item) = self.state.items.get_mut(index) {
                    item.increment();
                }
            }
            None => self.state.items.push(CartItem::new(product)),
        }

        self.persist();
    }

    /// Remove the line for `product`. Absent products are ignored.
    pub fn remove_item(&mut self, product: ProductUuid) {
        let Some(index) = self.state.position(product) else {
            return;
        };

        self.state.items.remove(index);
        self.persist();
    }

    /// Add one unit to the line for `product`. Absent products are ignored.
    pub fn increase_item_quantity(&mut self, product: ProductUuid) {
        let Some(item) = self
            .state
            .items
            .iter_mut()
            .find(|item| item.product_uuid() == product)
        else {
            return;
        };

        item.increment();
        self.persist();
    }

    /// Take one unit from the line for `product`, removing the line when it reaches zero.
    /// Absent products are ignored.
    pub fn decrease_item_quantity(&mut self, product: ProductUuid) {
        let Some(index) = self.state.position(product) else {
            return;
        };

        let keep = self
            .state
            .items
            .get_mut(index)
            .is_some_and(CartItem::decrement);

        if !keep {
            self.state.items.remove(index);
        }

        self.persist();
    }

    /// Show the cart panel.
    pub fn open(&mut self) {
        self.set_open(true);
    }

    /// Hide the cart panel.
    pub fn close(&mut self) {
        self.set_open(false);
    }

    /// Flip the visibility of the cart panel.
    pub fn toggle(&mut self) {
        self.set_open(!self.state.open);
    }

    /// Remove every line. Visibility is left alone.
    pub fn clear(&mut self) {
        if self.state.items.is_empty() {
            return;
        }

        self.state.items.clear();
        self.persist();
    }

    fn set_open(&mut self, open: bool) {
        if self.state.open == open {
            return;
        }

        self.state.open = open;
        self.persist();
    }

    fn persist(&self) {
        let snapshot = CartSnapshot::capture(&self.state, self.currency);

        if let Err(error) = self.persistence.save(&snapshot) {
            warn!(%error, "failed to persist cart");
        }
    }

    /// Current state.
    pub fn state(&self) -> &CartState<'a> {
        &self.state
    }

    /// Line items in display order.
    pub fn items(&self) -> &[CartItem<'a>] {
        self.state.items()
    }

    /// Line for `product`, if present.
    pub fn get(&self, product: ProductUuid) -> Option<&CartItem<'a>> {
        self.state
            .items
            .iter()
            .find(|item| item.product_uuid() == product)
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.state.items.len()
    }

    /// Whether the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.state.items.is_empty()
    }

    /// Total number of units across all lines.
    pub fn item_count(&self) -> u64 {
        self.state
            .items
            .iter()
            .map(|item| u64::from(item.quantity().get()))
            .sum()
    }

    /// Sum of line totals.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] on overflow or if a product is priced in another currency.
    pub fn subtotal(&self) -> Result<Money<'a, Currency>, PricingError> {
        subtotal(self.items(), self.currency)
    }

    /// Whether the cart panel is visible.
    pub fn is_open(&self) -> bool {
        self.state.open
    }

    /// Currency the cart is priced in.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// The persistence adapter.
    pub fn persistence(&self) -> &P {
        &self.persistence
    }
}
