//! Pricing
//!
//! Fixed-point money helpers shared by the cart, the ledger and the
//! persisted document layout. Every amount is held in minor units; rates are
//! fractional [`Percentage`]s (`0.30` is 30%).

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::{
    Money, MoneyError,
    iso::{self, Currency},
};
use thiserror::Error;

/// A monetary amount in one of the static ISO currencies.
pub type Amount = Money<'static, Currency>;

/// A fractional rate such as a tax or commission rate.
pub type Rate = Percentage;

/// Errors raised by pricing arithmetic and parsing.
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    /// A rate fell outside `0..=1`.
    #[error("rate {0} is outside the range 0..=1")]
    RateOutOfRange(Decimal),

    /// An amount that must be non-negative was negative.
    #[error("amount {0} must not be negative")]
    NegativeAmount(String),

    /// Percentage calculation could not be safely converted.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,

    /// A line total does not fit in minor units.
    #[error("line total overflowed")]
    Overflow,

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Invalid percentage format
    #[error("Invalid percentage format: {0}")]
    InvalidPercentage(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Zero in the given currency.
pub fn zero(currency: &'static Currency) -> Amount {
    Money::from_minor(0, currency)
}

/// The decimal value of a rate (`0.30` for 30%).
pub fn rate_value(rate: &Rate) -> Decimal {
    // decimal_percentage doesn't expose the inner Decimal
    *rate * Decimal::ONE
}

/// Checks that a rate lies within `0..=1` and returns its decimal value.
///
/// # Errors
///
/// Returns [`PricingError::RateOutOfRange`] otherwise.
pub fn validate_rate(rate: &Rate) -> Result<Decimal, PricingError> {
    let value = rate_value(rate);

    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(PricingError::RateOutOfRange(value));
    }

    Ok(value)
}

/// Calculate a percentage of a minor unit amount, rounded half away from zero.
///
/// # Errors
///
/// Returns [`PricingError::PercentConversion`] if the result cannot be represented.
pub fn percent_of_minor(rate: &Rate, minor: i64) -> Result<i64, PricingError> {
    let minor = Decimal::from_i64(minor).ok_or(PricingError::PercentConversion)?;

    rate_value(rate)
        .checked_mul(minor)
        .ok_or(PricingError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(PricingError::PercentConversion)
}

/// `round2(amount * rate)` for a non-negative amount and a rate in `0..=1`.
///
/// # Errors
///
/// Returns an error if the amount is negative, the rate is out of range, or
/// the product cannot be represented.
pub fn apply_rate(amount: Amount, rate: &Rate) -> Result<Amount, PricingError> {
    validate_rate(rate)?;
    ensure_non_negative(&amount)?;

    let minor = percent_of_minor(rate, amount.to_minor_units())?;

    Ok(Money::from_minor(minor, amount.currency()))
}

/// Fail with [`PricingError::NegativeAmount`] for amounts below zero.
///
/// # Errors
///
/// See above.
pub fn ensure_non_negative(amount: &Amount) -> Result<(), PricingError> {
    if amount.to_minor_units() < 0 {
        return Err(PricingError::NegativeAmount(amount.to_string()));
    }

    Ok(())
}

/// Unit price multiplied by a quantity.
///
/// # Errors
///
/// Returns [`PricingError::Overflow`] if the total does not fit in minor units.
pub fn line_total(unit_price: Amount, quantity: u32) -> Result<Amount, PricingError> {
    let minor = unit_price
        .to_minor_units()
        .checked_mul(i64::from(quantity))
        .ok_or(PricingError::Overflow)?;

    Ok(Money::from_minor(minor, unit_price.currency()))
}

/// Sums amounts in the given currency; an empty input is zero.
///
/// # Errors
///
/// Returns [`PricingError::Money`] on a currency mismatch.
pub fn total_price(
    amounts: impl IntoIterator<Item = Amount>,
    currency: &'static Currency,
) -> Result<Amount, PricingError> {
    let total = amounts
        .into_iter()
        .try_fold(zero(currency), |acc, amount| acc.add(amount))?;

    Ok(total)
}

/// Look up one of the supported currencies by ISO code.
///
/// # Errors
///
/// Returns [`PricingError::UnknownCurrency`] for anything else.
pub fn parse_currency(code: &str) -> Result<&'static Currency, PricingError> {
    match code.trim() {
        "USD" => Ok(iso::USD),
        "GBP" => Ok(iso::GBP),
        "EUR" => Ok(iso::EUR),
        other => Err(PricingError::UnknownCurrency(other.to_string())),
    }
}

/// Parse price string (e.g., "12.99 USD") into an amount
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY",
/// if the amount is not a decimal with at most two places, or if the
/// currency code is not recognized.
pub fn parse_price(s: &str) -> Result<Amount, PricingError> {
    let mut parts = s.split_whitespace();

    let (Some(amount), Some(code), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(PricingError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    };

    let amount = amount
        .parse::<Decimal>()
        .map_err(|_err| PricingError::InvalidPrice(s.to_string()))?;

    if amount.scale() > 2 {
        return Err(PricingError::InvalidPrice(s.to_string()));
    }

    let minor_units = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|value| value.to_i64())
        .ok_or_else(|| PricingError::InvalidPrice(s.to_string()))?;

    Ok(Money::from_minor(minor_units, parse_currency(code)?))
}

/// Parse percentage string (e.g., "30%" or "0.30") into a [`Rate`]
///
/// # Errors
///
/// Returns an error if the string cannot be parsed as a decimal.
pub fn parse_percentage(s: &str) -> Result<Rate, PricingError> {
    let trimmed = s.trim();

    let (digits, scale) = match trimmed.strip_suffix('%') {
        Some(percent) => (percent.trim(), Decimal::ONE_HUNDRED),
        None => (trimmed, Decimal::ONE),
    };

    let value = digits
        .parse::<Decimal>()
        .map_err(|_err| PricingError::InvalidPercentage(s.to_string()))?;

    let fraction = value
        .checked_div(scale)
        .ok_or_else(|| PricingError::InvalidPercentage(s.to_string()))?;

    Ok(Percentage::from(fraction))
}
