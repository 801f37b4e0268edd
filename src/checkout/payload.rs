//! Transaction request payload

use std::num::NonZeroU32;

use serde::Serialize;

use crate::{
    cart::CartItem,
    checkout::{GuestDetails, ShippingAddress},
    pricing::{PricingError, to_whole_units},
    shipments::ShipmentQuote,
    uuids::{ProductUuid, ProductVariantUuid, ShopUuid, VoucherUuid},
};

/// What a draft line refers to: the variant when there is one, otherwise the product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftTarget {
    /// A product without variants
    ProductId(ProductUuid),

    /// A specific product variant
    ProductVariantId(ProductVariantUuid),
}

/// One line of a transaction draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftLine {
    /// Product or variant being ordered
    #[serde(flatten)]
    pub target: DraftTarget,

    /// Quantity ordered
    pub quantity: NonZeroU32,
}

impl From<&CartItem<'_>> for DraftLine {
    fn from(item: &CartItem<'_>) -> Self {
        let product = item.product();
        let target = match product.variant {
            Some(variant) => DraftTarget::ProductVariantId(variant),
            None => DraftTarget::ProductId(product.uuid),
        };

        Self {
            target,
            quantity: item.quantity(),
        }
    }
}

/// Chosen shipment for a draft, as the order boundary expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftShipment {
    /// Opaque parameters from the quote
    pub parameter: String,

    /// Service description
    pub shipment_detail: String,

    /// Courier identifier
    pub courier: String,

    /// Cost in whole currency units
    pub cost: i64,
}

impl DraftShipment {
    /// Wire form of `quote`.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::FractionalAmount`] if the cost is not a whole amount.
    pub fn from_quote(quote: &ShipmentQuote<'_>) -> Result<Self, PricingError> {
        Ok(Self {
            parameter: quote.parameter.clone(),
            shipment_detail: quote.service.clone(),
            courier: quote.courier.clone(),
            cost: to_whole_units(&quote.cost)?,
        })
    }
}

/// One shop's part of the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionDraft {
    /// Shop fulfilling the draft
    pub shop_id: ShopUuid,

    /// Ordered lines
    pub details: Vec<DraftLine>,

    /// Chosen shipment
    pub shipment: DraftShipment,
}

/// Body of a transaction creation request.
///
/// The voucher, when present, applies once to the whole request rather than per draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRequest {
    /// One draft per shop, in the order shops first appear in the cart
    pub transactions: Vec<TransactionDraft>,

    /// Applied vouchers; at most one
    pub voucher_ids: Vec<VoucherUuid>,

    /// Delivery address
    #[serde(flatten)]
    pub address: ShippingAddress,

    /// Guest contact details, only for guest checkout
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub guest: Option<GuestDetails>,

    /// Note for the sellers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::IDR;
    use serde_json::json;
    use testresult::TestResult;

    use crate::{pricing::from_whole_units, products::Product};

    use super::*;

    #[test]
    fn lines_prefer_variant_ids() -> TestResult {
        let product = ProductUuid::now_v7();
        let variant = ProductVariantUuid::now_v7();
        let item = CartItem::new(Product {
            uuid: product,
            variant: Some(variant),
            name: "Kaos Batik - L".to_string(),
            price: from_whole_units(85_000, IDR)?,
            image: None,
            shop: ShopUuid::now_v7(),
            weight_grams: 200,
        });

        let line = serde_json::to_value(DraftLine::from(&item))?;

        assert_eq!(line, json!({ "product_variant_id": variant, "quantity": 1 }));

        Ok(())
    }

    #[test]
    fn request_flattens_address_and_guest() -> TestResult {
        let request = TransactionRequest {
            transactions: vec![],
            voucher_ids: vec![],
            address: ShippingAddress {
                recipient_name: "Sari".to_string(),
                ..ShippingAddress::default()
            },
            guest: Some(GuestDetails {
                name: "Sari".to_string(),
                email: "sari@example.test".to_string(),
                phone: "0812".to_string(),
            }),
            note: None,
        };

        let value = serde_json::to_value(&request)?;

        assert_eq!(
            value.get("recipient_name").and_then(serde_json::Value::as_str),
            Some("Sari")
        );
        assert_eq!(
            value.get("guest_email").and_then(serde_json::Value::as_str),
            Some("sari@example.test")
        );
        assert!(value.get("note").is_none());

        let member = TransactionRequest {
            guest: None,
            ..request
        };

        assert!(serde_json::to_value(&member)?.get("guest_name").is_none());

        Ok(())
    }
}
