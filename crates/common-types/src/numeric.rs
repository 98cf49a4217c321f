//! Integer fixed-point money arithmetic.
//!
//! All matching-path amounts, prices and fees are integer on-chain units;
//! decimal values appear only at the system boundary (`normalize_*` /
//! `denormalize_*`). Every multiplication that can exceed 63 bits goes
//! through a 128-bit intermediate and is checked on narrowing.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::asset::MAX_ASSET_DECIMALS;
use crate::error::DomainError;

/// Fixed-point denominator for all price calculations: a price is the number
/// of price-asset units per `PRICE_CONSTANT` amount-asset units.
pub const PRICE_CONSTANT: u64 = 100_000_000;

/// Exclusive upper bound on order amounts.
pub const MAX_AMOUNT: u64 = 100 * PRICE_CONSTANT * PRICE_CONSTANT;

/// Longest allowed `expiration - timestamp` window, in milliseconds (30 days).
pub const MAX_LIVE_TIME_MILLIS: u64 = 30 * 24 * 60 * 60 * 1000;

fn pow10(exponent: u8) -> u64 {
    10u64.pow(u32::from(exponent))
}

fn check_decimals(decimals: u8) -> Result<(), DomainError> {
    if decimals > MAX_ASSET_DECIMALS {
        return Err(DomainError::InvalidDecimals(decimals));
    }
    Ok(())
}

/// Converts a human-readable amount into integer units of the amount asset.
/// Truncates toward zero.
pub fn normalize_amount(value: Decimal, amount_decimals: u8) -> Result<u64, DomainError> {
    check_decimals(amount_decimals)?;
    let scaled = value
        .checked_mul(Decimal::from(pow10(amount_decimals)))
        .ok_or(DomainError::Overflow("normalize_amount"))?;
    scaled
        .trunc()
        .to_u64()
        .ok_or(DomainError::Overflow("normalize_amount"))
}

/// Converts a human-readable price into integer units scaled by
/// `10^(8 + price_decimals - amount_decimals)`. Truncates toward zero.
pub fn normalize_price(
    value: Decimal,
    amount_decimals: u8,
    price_decimals: u8,
) -> Result<u64, DomainError> {
    check_decimals(amount_decimals)?;
    check_decimals(price_decimals)?;
    let exponent = 8 + price_decimals - amount_decimals;
    let scaled = value
        .checked_mul(Decimal::from(pow10(exponent)))
        .ok_or(DomainError::Overflow("normalize_price"))?;
    scaled
        .trunc()
        .to_u64()
        .ok_or(DomainError::Overflow("normalize_price"))
}

/// Presentation-only inverse of [`normalize_amount`].
pub fn denormalize_amount(units: u64, amount_decimals: u8) -> Result<Decimal, DomainError> {
    check_decimals(amount_decimals)?;
    Ok(Decimal::from_i128_with_scale(
        i128::from(units),
        u32::from(amount_decimals),
    ))
}

/// Presentation-only inverse of [`normalize_price`].
pub fn denormalize_price(
    units: u64,
    amount_decimals: u8,
    price_decimals: u8,
) -> Result<Decimal, DomainError> {
    check_decimals(amount_decimals)?;
    check_decimals(price_decimals)?;
    let exponent = 8 + price_decimals - amount_decimals;
    Ok(Decimal::from_i128_with_scale(
        i128::from(units),
        u32::from(exponent),
    ))
}

/// Price-asset units settled when `amount` trades at `price`:
/// `⌊price * amount / PRICE_CONSTANT⌋`.
pub fn cost(amount: u64, price: u64) -> Result<u64, DomainError> {
    let total = u128::from(price) * u128::from(amount) / u128::from(PRICE_CONSTANT);
    u64::try_from(total).map_err(|_| DomainError::Overflow("cost"))
}

/// Dust correction: the smallest amount whose conversion back through `price`
/// still settles the same price-asset total as `amount` does.
pub fn correct_amount(amount: u64, price: u64) -> Result<u64, DomainError> {
    if price == 0 {
        return Err(DomainError::DivisionByZero("correct_amount"));
    }
    let price = u128::from(price);
    let settled_total = price * u128::from(amount) / u128::from(PRICE_CONSTANT);
    let corrected = (settled_total * u128::from(PRICE_CONSTANT)).div_ceil(price);
    u64::try_from(corrected).map_err(|_| DomainError::Overflow("correct_amount"))
}

/// The smallest amount that settles a non-zero cost at `price`:
/// `⌈PRICE_CONSTANT / price⌉`.
pub fn min_amount_for_price(price: u64) -> Result<u64, DomainError> {
    if price == 0 {
        return Err(DomainError::DivisionByZero("min_amount_for_price"));
    }
    let min = u128::from(PRICE_CONSTANT).div_ceil(u128::from(price));
    u64::try_from(min).map_err(|_| DomainError::Overflow("min_amount_for_price"))
}

/// Apportions `fee` to a partial execution: `⌊fee * partial / total_amount⌋`.
///
/// Summing over any partition of `total_amount` never exceeds `fee`.
pub fn partial_fee(fee: u64, total_amount: u64, partial: u64) -> Result<u64, DomainError> {
    if total_amount == 0 {
        return Err(DomainError::DivisionByZero("partial_fee"));
    }
    let share = u128::from(fee) * u128::from(partial) / u128::from(total_amount);
    u64::try_from(share).map_err(|_| DomainError::Overflow("partial_fee"))
}
