//! Shipments
//!
//! Shipping rates come from an external quote provider. The core only needs the courier,
//! the service and the cost; everything else is passed back to the order boundary as-is.

use async_trait::async_trait;
use mockall::automock;
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};

use crate::{
    api::{ApiError, records::ShipmentQuoteRecord},
    checkout::Partition,
    uuids::ShopUuid,
};

/// Quote for delivering one shop's partition.
#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentQuote<'a> {
    /// Courier identifier, e.g. `jne`
    pub courier: String,

    /// Human readable service description, e.g. `REG - Layanan Reguler`
    pub service: String,

    /// Delivery cost
    pub cost: Money<'a, Currency>,

    /// Estimated delivery time as given by the courier, e.g. `2-3 days`
    pub estimated_delivery: Option<String>,

    /// Opaque request parameters echoed back when the transaction is created.
    pub parameter: String,
}

/// What a quote is requested for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentQuoteRequest {
    /// Shop shipping the parcel; the origin is the shop's address.
    pub shop_id: ShopUuid,

    /// Destination area code
    pub destination: String,

    /// Parcel weight in grams
    pub weight: u64,

    /// Courier to quote
    pub courier: String,
}

impl ShipmentQuoteRequest {
    /// Request covering every item of `partition`.
    pub fn for_partition(
        partition: &Partition<'_>,
        destination: impl Into<String>,
        courier: impl Into<String>,
    ) -> Self {
        Self {
            shop_id: partition.shop,
            destination: destination.into(),
            weight: partition.weight_grams(),
            courier: courier.into(),
        }
    }
}

/// External shipping rate lookup.
#[automock]
#[async_trait]
pub trait ShipmentQuoteProvider: Send + Sync {
    /// Available services and their costs for `request`.
    async fn quote(
        &self,
        request: ShipmentQuoteRequest,
    ) -> Result<Vec<ShipmentQuoteRecord>, ApiError>;
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use rusty_money::iso::IDR;
    use testresult::TestResult;

    use crate::{
        cart::CartItem,
        checkout::partition_by_shop,
        pricing::from_whole_units,
        products::Product,
        uuids::ProductUuid,
    };

    use super::*;

    #[test]
    fn request_weight_covers_whole_partition() -> TestResult {
        let shop = ShopUuid::now_v7();
        let product = |weight_grams| -> TestResult<Product<'static>> {
            Ok(Product {
                uuid: ProductUuid::now_v7(),
                variant: None,
                name: "Beras Merah".to_string(),
                price: from_whole_units(30_000, IDR)?,
                image: None,
                shop,
                weight_grams,
            })
        };

        let items = [
            CartItem::with_quantity(product(1_000)?, NonZeroU32::new(2).ok_or("zero")?),
            CartItem::new(product(250)?),
        ];

        let partitions = partition_by_shop(&items);
        let partition = partitions.first().ok_or("no partition")?;
        let request = ShipmentQuoteRequest::for_partition(partition, "3171", "jne");

        assert_eq!(request.shop_id, shop);
        assert_eq!(request.weight, 2_250);

        Ok(())
    }
}
