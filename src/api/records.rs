//! Wire records
//!
//! Amounts are integers in whole currency units. Each record converts into its domain
//! type once the store currency is known.

use jiff::Timestamp;
use rust_decimal::Decimal;
use rusty_money::iso::Currency;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    api::ApiError,
    pricing::from_whole_units,
    products::Product,
    shipments::{ShipmentQuote, ShipmentQuoteRequest},
    uuids::{ProductUuid, ProductVariantUuid, ShopUuid, VoucherUuid},
    vouchers::{Voucher, VoucherKind},
};

/// Product as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Product identity
    pub id: ProductUuid,

    /// Variant identity, when the listing is for a variant
    #[serde(default)]
    pub product_variant_id: Option<ProductVariantUuid>,

    /// Product name
    pub name: String,

    /// Unit price in whole currency units
    pub price: i64,

    /// Image URL
    #[serde(default)]
    pub image: Option<String>,

    /// Shop selling the product
    pub shop_id: ShopUuid,

    /// Unit weight in grams
    #[serde(default)]
    pub weight: u32,

    /// Units in stock, informational only
    #[serde(default)]
    pub stock: Option<u32>,
}

impl ProductRecord {
    /// Domain product priced in `currency`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Pricing`] if the price cannot be represented.
    pub fn into_product(self, currency: &Currency) -> Result<Product<'_>, ApiError> {
        Ok(Product {
            uuid: self.id,
            variant: self.product_variant_id,
            name: self.name,
            price: from_whole_units(self.price, currency)?,
            image: self.image,
            shop: self.shop_id,
            weight_grams: self.weight,
        })
    }
}

/// Voucher discount type on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoucherType {
    /// Fixed amount off
    Fixed,
    /// Percentage off
    Percentage,
}

/// Voucher as listed by the voucher service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherRecord {
    /// Voucher identity
    pub id: VoucherUuid,

    /// Unique code
    pub code: String,

    /// Display name
    pub name: String,

    /// Description
    #[serde(default)]
    pub description: Option<String>,

    /// Discount type
    #[serde(rename = "type")]
    pub kind: VoucherType,

    /// Amount off for fixed vouchers, whole currency units
    #[serde(default)]
    pub fixed_amount: Option<i64>,

    /// Percentage off for percentage vouchers
    #[serde(default)]
    pub percentage_amount: Option<Decimal>,

    /// Start of the redemption window
    pub start_date: Timestamp,

    /// End of the redemption window
    pub end_date: Timestamp,

    /// Active flag; `true`/`false` or `1`/`0`
    #[serde(deserialize_with = "flag")]
    pub status: bool,
}

impl VoucherRecord {
    /// Domain voucher priced in `currency`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRecord`] if the amount for the voucher type is missing,
    /// or [`ApiError::Pricing`] if it cannot be represented.
    pub fn into_voucher(self, currency: &Currency) -> Result<Voucher<'_>, ApiError> {
        let kind = match self.kind {
            VoucherType::Fixed => {
                let amount = self
                    .fixed_amount
                    .ok_or_else(|| invalid(&self.code, "fixed voucher without fixed_amount"))?;

                VoucherKind::Fixed(from_whole_units(amount, currency)?)
            }
            VoucherType::Percentage => {
                let percent = self.percentage_amount.ok_or_else(|| {
                    invalid(&self.code, "percentage voucher without percentage_amount")
                })?;

                VoucherKind::Percentage(percent)
            }
        };

        Ok(Voucher {
            uuid: self.id,
            code: self.code,
            name: self.name,
            description: self.description,
            kind,
            starts_at: self.start_date,
            ends_at: self.end_date,
            active: self.status,
        })
    }
}

fn invalid(code: &str, reason: &str) -> ApiError {
    ApiError::InvalidRecord {
        kind: "voucher",
        id: code.to_string(),
        reason: reason.to_string(),
    }
}

/// Accept a boolean or a `0`/`1` integer.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => value,
        Flag::Int(value) => value != 0,
    })
}

/// One service offered by a courier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentQuoteRecord {
    /// Courier identifier
    pub courier: String,

    /// Service code, e.g. `REG`
    pub service: String,

    /// Service description
    #[serde(default)]
    pub description: Option<String>,

    /// Cost in whole currency units
    pub cost: i64,

    /// Estimated time of delivery
    #[serde(default)]
    pub etd: Option<String>,
}

impl ShipmentQuoteRecord {
    /// Domain quote priced in `currency`, carrying `request` as its opaque parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Pricing`] if the cost cannot be represented.
    pub fn into_quote<'a>(
        self,
        request: &ShipmentQuoteRequest,
        currency: &'a Currency,
    ) -> Result<ShipmentQuote<'a>, ApiError> {
        let service = match self.description {
            Some(description) => format!("{} - {description}", self.service),
            None => self.service,
        };

        Ok(ShipmentQuote {
            courier: self.courier,
            service,
            cost: from_whole_units(self.cost, currency)?,
            estimated_delivery: self.etd,
            parameter: serde_json::to_string(request).map_err(|err| {
                ApiError::UnexpectedResponse(format!("unserialisable quote request: {err}"))
            })?,
        })
    }
}
