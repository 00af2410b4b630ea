//! Conversions between `Decimal` amounts and the integer cents stored in
//! SQLite.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{LedgerError, LedgerResult};

/// Rounds to whole cents, half away from zero. This is the value storage keeps.
pub fn round_to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Converts an amount to cents, rounding half away from zero to two places.
pub fn to_cents(amount: Decimal) -> LedgerResult<i64> {
    round_to_cents(amount)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .ok_or_else(|| LedgerError::Validation("Amount is too large".to_string()))
}

/// Converts a strictly positive amount to cents.
pub fn positive_cents(amount: Decimal) -> LedgerResult<i64> {
    let cents = to_cents(amount)?;
    if cents <= 0 {
        return Err(LedgerError::Validation(
            "Amount must be greater than zero".to_string(),
        ));
    }
    Ok(cents)
}

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
