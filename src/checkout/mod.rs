//! Checkout
//!
//! Groups the cart by shop, prices each group with its shipment quote and applies the
//! selected voucher once against the cart-wide subtotal.

use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};

use crate::{
    cart::CartItem,
    discounts::voucher_discount,
    pricing::{PricingError, subtotal},
    shipments::ShipmentQuote,
    uuids::ShopUuid,
    vouchers::Voucher,
};

mod details;
mod errors;
mod flow;
mod payload;
mod session;

pub use details::{CheckoutDetails, CheckoutField, GuestDetails, ShippingAddress};
pub use errors::CheckoutError;
pub use flow::{CheckoutFlow, CheckoutStatus, PendingSubmission, SubmissionResolution};
pub use payload::{DraftLine, DraftShipment, DraftTarget, TransactionDraft, TransactionRequest};
pub use session::{
    AccessToken, CheckoutKind, CheckoutStrategy, GuestCheckout, MemberCheckout,
    MockSessionProvider, Session, SessionGate, SessionProvider, StaticSessionProvider,
};

/// Items from one shop, submitted together as one transaction draft.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition<'a> {
    /// Shop selling every item in the partition
    pub shop: ShopUuid,

    /// Items in cart order
    pub items: Vec<CartItem<'a>>,
}

impl Partition<'_> {
    /// Combined shipping weight in grams.
    pub fn weight_grams(&self) -> u64 {
        self.items.iter().map(CartItem::weight_grams).sum()
    }
}

/// Split `items` by shop, keeping shops in the order they first appear.
pub fn partition_by_shop<'a>(items: &[CartItem<'a>]) -> Vec<Partition<'a>> {
    let mut index: FxHashMap<ShopUuid, usize> = FxHashMap::default();
    let mut partitions: Vec<Partition<'a>> = Vec::new();

    for item in items {
        let slot = *index.entry(item.shop()).or_insert_with(|| {
            partitions.push(Partition {
                shop: item.shop(),
                items: Vec::new(),
            });
            partitions.len() - 1
        });

        if let Some(partition) = partitions.get_mut(slot) {
            partition.items.push(item.clone());
        }
    }

    partitions
}

/// Totals for one partition.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionSummary<'a> {
    /// Shop of the partition
    pub shop: ShopUuid,

    /// Sum of line totals
    pub subtotal: Money<'a, Currency>,

    /// Cost of the chosen shipment quote
    pub shipment_cost: Money<'a, Currency>,

    /// Subtotal plus shipment
    pub total: Money<'a, Currency>,
}

/// Figures shown to the buyer before submitting.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSummary<'a> {
    /// Per shop totals, in cart order
    pub partitions: Vec<PartitionSummary<'a>>,

    /// Sum of all partition subtotals
    pub subtotal: Money<'a, Currency>,

    /// Sum of all shipment costs
    pub shipment_cost: Money<'a, Currency>,

    /// Voucher discount, applied once
    pub discount: Money<'a, Currency>,

    /// Subtotal plus shipment minus discount, never negative
    pub grand_total: Money<'a, Currency>,
}

/// Combines cart items, shipment quotes and the selected voucher.
#[derive(Debug)]
pub struct CheckoutAggregator<'c, 'a> {
    items: &'c [CartItem<'a>],
    quotes: &'c FxHashMap<ShopUuid, ShipmentQuote<'a>>,
    voucher: Option<&'c Voucher<'a>>,
    currency: &'static Currency,
}

impl<'c, 'a> CheckoutAggregator<'c, 'a> {
    /// Aggregator over `items`, priced in `currency`.
    pub fn new(
        items: &'c [CartItem<'a>],
        quotes: &'c FxHashMap<ShopUuid, ShipmentQuote<'a>>,
        voucher: Option<&'c Voucher<'a>>,
        currency: &'static Currency,
    ) -> Self {
        Self {
            items,
            quotes,
            voucher,
            currency,
        }
    }

    /// Items grouped by shop.
    pub fn partitions(&self) -> Vec<Partition<'a>> {
        partition_by_shop(self.items)
    }

    /// Shops in the cart that have no shipment quote yet, in cart order.
    pub fn missing_quotes(&self) -> Vec<ShopUuid> {
        self.partitions()
            .into_iter()
            .map(|partition| partition.shop)
            .filter(|shop| !self.quotes.contains_key(shop))
            .collect()
    }

    /// Price the checkout.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::EmptyCart`]: there are no items.
    /// - [`CheckoutError::MissingShipmentQuote`]: a shop has no quote.
    /// - [`CheckoutError::Pricing`] or [`CheckoutError::Discount`]: arithmetic failed.
    pub fn summary(&self) -> Result<CheckoutSummary<'a>, CheckoutError> {
        if self.items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let zero = Money::from_minor(0, self.currency);
        let mut partitions = Vec::new();
        let mut cart_subtotal = zero;
        let mut shipment_cost = zero;

        for partition in self.partitions() {
            let quote = self
                .quotes
                .get(&partition.shop)
                .ok_or(CheckoutError::MissingShipmentQuote(partition.shop))?;

            let partition_subtotal = subtotal(&partition.items, self.currency)?;
            let total = partition_subtotal
                .add(quote.cost)
                .map_err(PricingError::from)?;

            cart_subtotal = cart_subtotal
                .add(partition_subtotal)
                .map_err(PricingError::from)?;
            shipment_cost = shipment_cost
                .add(quote.cost)
                .map_err(PricingError::from)?;

            partitions.push(PartitionSummary {
                shop: partition.shop,
                subtotal: partition_subtotal,
                shipment_cost: quote.cost,
                total,
            });
        }

        let discount = match self.voucher {
            Some(voucher) => voucher_discount(voucher, &cart_subtotal)?,
            None => zero,
        };

        let gross = cart_subtotal
            .add(shipment_cost)
            .and_then(|gross| gross.sub(discount))
            .map_err(PricingError::from)?;

        let grand_total = Money::from_minor(gross.to_minor_units().max(0), self.currency);

        Ok(CheckoutSummary {
            partitions,
            subtotal: cart_subtotal,
            shipment_cost,
            discount,
            grand_total,
        })
    }

    /// One draft per shop, in cart order.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::EmptyCart`]: there are no items.
    /// - [`CheckoutError::MissingShipmentQuote`]: a shop has no quote.
    /// - [`CheckoutError::Pricing`]: a shipment cost is not a whole amount.
    pub fn drafts(&self) -> Result<Vec<TransactionDraft>, CheckoutError> {
        if self.items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        self.partitions()
            .into_iter()
            .map(|partition| -> Result<TransactionDraft, CheckoutError> {
                let quote = self
                    .quotes
                    .get(&partition.shop)
                    .ok_or(CheckoutError::MissingShipmentQuote(partition.shop))?;

                Ok(TransactionDraft {
                    shop_id: partition.shop,
                    details: partition.items.iter().map(DraftLine::from).collect(),
                    shipment: DraftShipment::from_quote(quote)?,
                })
            })
            .collect()
    }

    /// Full request body for `details`, with guest contact details when given.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] if the drafts cannot be built; see [`Self::drafts`].
    pub fn request(
        &self,
        details: &CheckoutDetails,
        guest: Option<GuestDetails>,
    ) -> Result<TransactionRequest, CheckoutError> {
        Ok(TransactionRequest {
            transactions: self.drafts()?,
            voucher_ids: self.voucher.map(|voucher| voucher.uuid).into_iter().collect(),
            address: details.address.clone(),
            guest,
            note: details.note.clone(),
        })
    }
}
