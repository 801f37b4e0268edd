//! Products

use rusty_money::{Money, iso::Currency};

use crate::uuids::{ProductUuid, ProductVariantUuid, ShopUuid};

/// Product as shown on a product detail view, ready to be added to the cart.
#[derive(Debug, Clone, PartialEq)]
pub struct Product<'a> {
    /// Product identity; unique within the cart.
    pub uuid: ProductUuid,

    /// Variant being purchased, when the product has variants.
    pub variant: Option<ProductVariantUuid>,

    /// Product name
    pub name: String,

    /// Unit price
    pub price: Money<'a, Currency>,

    /// Product image URL
    pub image: Option<String>,

    /// Shop (seller) the product belongs to
    pub shop: ShopUuid,

    /// Shipping weight of one unit, in grams
    pub weight_grams: u32,
}
