//! Discounts
//!
//! Voucher discounts are computed once against a discountable base and never exceed it.

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;

use crate::{
    pricing::{PricingError, from_whole_units},
    vouchers::{Voucher, VoucherKind},
};

/// Errors specific to discount calculations.
#[derive(Debug, Error, PartialEq)]
pub enum DiscountError {
    /// Percentage calculation could not be safely represented.
    #[error("percentage discount overflowed")]
    PercentConversion,

    /// The percentage is negative.
    #[error("percentage {0} is negative")]
    NegativePercentage(Decimal),

    /// Wrapped pricing error.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Fixed amount off, clamped to `base`.
///
/// # Errors
///
/// Returns [`DiscountError::Money`] if `amount` and `base` are in different currencies.
pub fn fixed_discount<'a>(
    amount: &Money<'a, Currency>,
    base: &Money<'a, Currency>,
) -> Result<Money<'a, Currency>, DiscountError> {
    if amount.currency() != base.currency() {
        return Err(MoneyError::CurrencyMismatch {
            expected: base.currency().iso_alpha_code,
            actual: amount.currency().iso_alpha_code,
        }
        .into());
    }

    Ok(clamp(amount.to_minor_units(), base))
}

/// `percent`% of `base`, rounded half away from zero to whole currency units and clamped
/// to `base`.
///
/// `base` may carry a fractional part (e.g. cents); only the discount is rounded.
///
/// # Errors
///
/// - [`DiscountError::NegativePercentage`]: `percent` is below zero.
/// - [`DiscountError::PercentConversion`]: the result cannot be represented.
/// - [`DiscountError::Pricing`]: the rounded discount overflows minor units.
pub fn percentage_discount<'a>(
    percent: Decimal,
    base: &Money<'a, Currency>,
) -> Result<Money<'a, Currency>, DiscountError> {
    if percent < Decimal::ZERO {
        return Err(DiscountError::NegativePercentage(percent));
    }

    let whole = Decimal::try_new(base.to_minor_units(), base.currency().exponent)
        .map_err(|_err| DiscountError::PercentConversion)?;

    let applied = whole
        .checked_mul(percent)
        .and_then(|value| value.checked_div(Decimal::ONE_HUNDRED))
        .ok_or(DiscountError::PercentConversion)?;

    let rounded = applied
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(DiscountError::PercentConversion)?;

    let discount = from_whole_units(rounded, base.currency())?;

    Ok(clamp(discount.to_minor_units(), base))
}

/// Discount granted by `voucher` against `base`.
///
/// # Errors
///
/// Returns a [`DiscountError`] if the amount cannot be computed; see [`fixed_discount`]
/// and [`percentage_discount`].
pub fn voucher_discount<'a>(
    voucher: &Voucher<'a>,
    base: &Money<'a, Currency>,
) -> Result<Money<'a, Currency>, DiscountError> {
    match &voucher.kind {
        VoucherKind::Fixed(amount) => fixed_discount(amount, base),
        VoucherKind::Percentage(percent) => percentage_discount(*percent, base),
    }
}

/// Clamp a discount in minor units into `0..=base`.
fn clamp<'a>(minor: i64, base: &Money<'a, Currency>) -> Money<'a, Currency> {
    let ceiling = base.to_minor_units().max(0);

    Money::from_minor(minor.clamp(0, ceiling), base.currency())
}
