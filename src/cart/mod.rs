//! Cart
//!
//! Line items the buyer intends to purchase, keyed by product, in the order they were added.

use std::num::NonZeroU32;

use rusty_money::{Money, iso::Currency};

use crate::{
    pricing::{PricingError, line_total},
    products::Product,
    uuids::{ProductUuid, ShopUuid},
};

mod persistence;
mod store;

pub use persistence::{
    CartItemSnapshot, CartPersistence, CartSnapshot, CartStorageError, DEFAULT_NAMESPACE,
    JsonFileCartStorage, MemoryCartStorage,
};
pub use store::CartStore;

/// A product and the quantity of it in the cart.
#[derive(Debug, Clone, PartialEq)]
pub struct CartItem<'a> {
    product: Product<'a>,
    quantity: NonZeroU32,
}

impl<'a> CartItem<'a> {
    /// New line item with a quantity of one.
    pub fn new(product: Product<'a>) -> Self {
        Self::with_quantity(product, NonZeroU32::MIN)
    }

    /// New line item with the given quantity.
    pub fn with_quantity(product: Product<'a>, quantity: NonZeroU32) -> Self {
        Self { product, quantity }
    }

    /// Product in this line.
    pub fn product(&self) -> &Product<'a> {
        &self.product
    }

    /// Product identity, the key of the line within the cart.
    pub fn product_uuid(&self) -> ProductUuid {
        self.product.uuid
    }

    /// Shop selling the product.
    pub fn shop(&self) -> ShopUuid {
        self.product.shop
    }

    /// Unit price
    pub fn price(&self) -> &Money<'a, Currency> {
        &self.product.price
    }

    /// Quantity, always at least one.
    pub fn quantity(&self) -> NonZeroU32 {
        self.quantity
    }

    /// Unit price multiplied by quantity.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::Overflow`] if the total does not fit in minor units.
    pub fn line_total(&self) -> Result<Money<'a, Currency>, PricingError> {
        line_total(&self.product.price, self.quantity)
    }

    /// Shipping weight of the whole line, in grams.
    pub fn weight_grams(&self) -> u64 {
        u64::from(self.product.weight_grams) * u64::from(self.quantity.get())
    }

    /// Add one to the quantity, saturating at `u32::MAX`.
    pub(crate) fn increment(&mut self) {
        self.quantity = self.quantity.saturating_add(1);
    }

    /// Take one from the quantity. Returns `false` when the line was at one and should be
    /// removed instead.
    pub(crate) fn decrement(&mut self) -> bool {
        match NonZeroU32::new(self.quantity.get() - 1) {
            Some(quantity) => {
                self.quantity = quantity;
                true
            }
            None => false,
        }
    }
}

/// Ordered line items plus the visibility of the cart panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartState<'a> {
    items: Vec<CartItem<'a>>,
    open: bool,
}

impl<'a> CartState<'a> {
    /// Build a state from already validated parts.
    pub fn new(items: Vec<CartItem<'a>>, open: bool) -> Self {
        Self { items, open }
    }

    /// Line items in display order.
    pub fn items(&self) -> &[CartItem<'a>] {
        &self.items
    }

    /// Whether the cart panel is visible.
    pub fn is_open(&self) -> bool {
        self.open
    }

    fn position(&self, product: ProductUuid) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.product_uuid() == product)
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::IDR;
    use testresult::TestResult;

    use crate::pricing::from_whole_units;

    use super::*;

    fn product(price: i64, weight_grams: u32) -> TestResult<Product<'static>> {
        Ok(Product {
            uuid: ProductUuid::now_v7(),
            variant: None,
            name: "Tenun Ikat".to_string(),
            price: from_whole_units(price, IDR)?,
            image: Some("https://cdn.example.test/tenun.jpg".to_string()),
            shop: ShopUuid::now_v7(),
            weight_grams,
        })
    }

    #[test]
    fn new_item_has_quantity_one() -> TestResult {
        let item = CartItem::new(product(20_000, 100)?);

        assert_eq!(item.quantity().get(), 1);

        Ok(())
    }

    #[test]
    fn decrement_at_one_signals_removal() -> TestResult {
        let mut item = CartItem::new(product(20_000, 100)?);

        assert!(!item.decrement(), "quantity one should not decrement");
        assert_eq!(item.quantity().get(), 1);

        Ok(())
    }

    #[test]
    fn increment_saturates() -> TestResult {
        let mut item = CartItem::with_quantity(product(1, 1)?, NonZeroU32::MAX);

        item.increment();

        assert_eq!(item.quantity(), NonZeroU32::MAX);

        Ok(())
    }

    #[test]
    fn line_weight_scales_with_quantity() -> TestResult {
        let quantity = NonZeroU32::new(3).ok_or("zero quantity")?;
        let item = CartItem::with_quantity(product(20_000, 250)?, quantity);

        assert_eq!(item.weight_grams(), 750);
        assert_eq!(item.line_total()?, from_whole_units(60_000, IDR)?);

        Ok(())
    }
}
