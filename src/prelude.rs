//! Bazaar prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    api::{ApiError, MarketplaceClient, MarketplaceConfig, ProductCatalog, VoucherCatalog},
    cart::{CartItem, CartPersistence, CartState, CartStore, JsonFileCartStorage},
    checkout::{
        CheckoutAggregator, CheckoutDetails, CheckoutError, CheckoutFlow, CheckoutStatus,
        CheckoutSummary, GuestDetails, Session, SessionGate, ShippingAddress,
    },
    discounts::DiscountError,
    pricing::PricingError,
    products::Product,
    receipt::ReceiptError,
    shipments::{ShipmentQuote, ShipmentQuoteProvider},
    transactions::{CreatedTransactions, SubmissionError, TransactionGateway},
    uuids::{ProductUuid, ShopUuid, UserUuid, VoucherUuid},
    vouchers::{Voucher, VoucherKind, VoucherSelector},
};
