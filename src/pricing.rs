//! Pricing
//!
//! Line totals and subtotals over cart items, plus the conversion between `Money` and the
//! whole-unit integer amounts used on the wire.

use std::num::NonZeroU32;

use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;

use crate::cart::CartItem;

/// Errors that can occur while pricing cart items.
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    /// Arithmetic on minor units overflowed.
    #[error("amount overflowed while pricing")]
    Overflow,

    /// A money value has a fractional part and cannot be expressed in whole units.
    #[error("{amount} minor units of {currency} is not a whole amount")]
    FractionalAmount {
        /// Amount in minor units
        amount: i64,

        /// ISO code of the currency
        currency: &'static str,
    },

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Number of minor units in one whole unit of `currency`.
fn minor_per_unit(currency: &Currency) -> Result<i64, PricingError> {
    10_i64
        .checked_pow(currency.exponent)
        .ok_or(PricingError::Overflow)
}

/// Build a `Money` from an amount in whole currency units.
///
/// # Errors
///
/// Returns [`PricingError::Overflow`] if the amount cannot be represented in minor units.
pub fn from_whole_units(
    amount: i64,
    currency: &Currency,
) -> Result<Money<'_, Currency>, PricingError> {
    let minor = amount
        .checked_mul(minor_per_unit(currency)?)
        .ok_or(PricingError::Overflow)?;

    Ok(Money::from_minor(minor, currency))
}

/// Express a `Money` in whole currency units.
///
/// # Errors
///
/// Returns [`PricingError::FractionalAmount`] if the value is not a whole amount.
pub fn to_whole_units(money: &Money<'_, Currency>) -> Result<i64, PricingError> {
    let currency = money.currency();
    let minor = money.to_minor_units();
    let per_unit = minor_per_unit(currency)?;

    if minor % per_unit != 0 {
        return Err(PricingError::FractionalAmount {
            amount: minor,
            currency: currency.iso_alpha_code,
        });
    }

    Ok(minor / per_unit)
}

/// Unit price multiplied by quantity.
///
/// # Errors
///
/// Returns [`PricingError::Overflow`] if the product does not fit in minor units.
pub fn line_total<'a>(
    price: &Money<'a, Currency>,
    quantity: NonZeroU32,
) -> Result<Money<'a, Currency>, PricingError> {
    let minor = price
        .to_minor_units()
        .checked_mul(i64::from(quantity.get()))
        .ok_or(PricingError::Overflow)?;

    Ok(Money::from_minor(minor, price.currency()))
}

/// Sum of line totals for `items`, zero in `currency` when there are none.
///
/// # Errors
///
/// - [`PricingError::Overflow`]: a line total overflowed.
/// - [`PricingError::Money`]: an item is priced in a currency other than `currency`.
pub fn subtotal<'a>(
    items: &[CartItem<'a>],
    currency: &'a Currency,
) -> Result<Money<'a, Currency>, PricingError> {
    items
        .iter()
        .try_fold(Money::from_minor(0, currency), |acc, item| {
            Ok(acc.add(item.line_total()?)?)
        })
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{IDR, USD};
    use testresult::TestResult;

    use crate::{
        products::Product,
        uuids::{ProductUuid, ShopUuid},
    };

    use super::*;

    fn item<'a>(price: Money<'a, Currency>, quantity: u32) -> TestResult<CartItem<'a>> {
        let product = Product {
            uuid: ProductUuid::now_v7(),
            variant: None,
            name: "Kopi Gayo".to_string(),
            price,
            image: None,
            shop: ShopUuid::now_v7(),
            weight_grams: 250,
        };

        let quantity = NonZeroU32::new(quantity).ok_or("zero quantity")?;

        Ok(CartItem::with_quantity(product, quantity))
    }

    #[test]
    fn whole_units_round_trip_through_minor_units() -> TestResult {
        let money = from_whole_units(20_000, IDR)?;

        assert_eq!(money.to_minor_units(), 20_000 * 10_i64.pow(IDR.exponent));
        assert_eq!(to_whole_units(&money)?, 20_000);

        Ok(())
    }

    #[test]
    fn fractional_amounts_are_rejected() {
        let money = Money::from_minor(1_050, USD);

        assert_eq!(
            to_whole_units(&money),
            Err(PricingError::FractionalAmount {
                amount: 1_050,
                currency: "USD",
            })
        );
    }

    #[test]
    fn from_whole_units_overflow() {
        assert_eq!(from_whole_units(i64::MAX, USD), Err(PricingError::Overflow));
    }

    #[test]
    fn line_total_multiplies_by_quantity() -> TestResult {
        let price = from_whole_units(20_000, IDR)?;
        let total = line_total(&price, NonZeroU32::new(2).ok_or("zero quantity")?)?;

        assert_eq!(total, from_whole_units(40_000, IDR)?);

        Ok(())
    }

    #[test]
    fn line_total_overflow() -> TestResult {
        let price = Money::from_minor(i64::MAX, IDR);

        assert_eq!(
            line_total(&price, NonZeroU32::new(2).ok_or("zero quantity")?),
            Err(PricingError::Overflow)
        );

        Ok(())
    }

    #[test]
    fn subtotal_sums_line_totals() -> TestResult {
        let items = [
            item(from_whole_units(20_000, IDR)?, 2)?,
            item(from_whole_units(15_000, IDR)?, 1)?,
        ];

        assert_eq!(subtotal(&items, IDR)?, from_whole_units(55_000, IDR)?);

        Ok(())
    }

    #[test]
    fn subtotal_of_nothing_is_zero() -> TestResult {
        assert_eq!(subtotal(&[], IDR)?, Money::from_minor(0, IDR));

        Ok(())
    }

    #[test]
    fn subtotal_currency_mismatch_errors() -> TestResult {
        let items = [item(from_whole_units(10, USD)?, 1)?];

        assert!(matches!(subtotal(&items, IDR), Err(PricingError::Money(_))));

        Ok(())
    }
}
