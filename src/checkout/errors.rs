//! Checkout errors

use thiserror::Error;

use crate::{
    checkout::CheckoutField,
    discounts::DiscountError,
    pricing::PricingError,
    transactions::SubmissionError,
    uuids::ShopUuid,
};

/// Reasons checkout cannot proceed.
///
/// Everything except [`CheckoutError::Submission`] is detected locally, before any request
/// is sent.
#[derive(Debug, Error, PartialEq)]
pub enum CheckoutError {
    /// There is nothing in the cart.
    #[error("the cart is empty")]
    EmptyCart,

    /// No shipment quote has been chosen for a shop in the cart.
    #[error("no shipment quote for shop {0}")]
    MissingShipmentQuote(ShopUuid),

    /// Required fields are empty.
    #[error("missing required fields: {}", join(.0))]
    MissingFields(Vec<CheckoutField>),

    /// The guest email address is not usable.
    #[error("guest email {0:?} is not a valid address")]
    InvalidEmail(String),

    /// The selected voucher is outside its window or was deactivated.
    #[error("voucher {0} is no longer valid")]
    VoucherNoLongerValid(String),

    /// A submission is already in flight.
    #[error("a submission is already in progress")]
    AlreadySubmitting,

    /// The checkout view was closed.
    #[error("checkout was closed")]
    Closed,

    /// Pricing the cart failed.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Computing the voucher discount failed.
    #[error(transparent)]
    Discount(#[from] DiscountError),

    /// The order boundary did not create the transactions.
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

fn join(fields: &[CheckoutField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
