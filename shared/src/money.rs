//! Money helpers
//!
//! All persisted amounts are `i64` minor currency units (cents) so sums
//! and equality checks stay exact. `rust_decimal` is used only at the
//! edges: parsing operator-supplied decimal strings and formatting
//! amounts for display.

use rust_decimal::prelude::*;
use thiserror::Error;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed amount in minor units (1,000,000.00)
pub const MAX_AMOUNT: i64 = 100_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("amount is not a valid decimal number: {0}")]
    Malformed(String),

    #[error("amount must be non-negative, got {0}")]
    Negative(String),

    #[error("amount exceeds maximum allowed")]
    TooLarge,
}

/// Convert minor units to a `Decimal` with two fractional digits.
pub fn to_decimal(minor: i64) -> Decimal {
    Decimal::new(minor, DECIMAL_PLACES)
}

/// Format minor units as a plain decimal string, e.g. `2488` → `"24.88"`.
pub fn format_minor(minor: i64) -> String {
    to_decimal(minor).to_string()
}

/// Parse a decimal amount string into minor units.
///
/// Rounds to 2 decimal places half-up, mirroring how order totals are
/// rounded elsewhere. Rejects negative and absurdly large values.
pub fn parse_amount(input: &str) -> Result<i64, MoneyError> {
    let dec: Decimal = input
        .trim()
        .parse()
        .map_err(|_| MoneyError::Malformed(input.to_string()))?;
    if dec.is_sign_negative() {
        return Err(MoneyError::Negative(input.to_string()));
    }
    let rounded = dec.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);
    let minor = (rounded * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or(MoneyError::TooLarge)?;
    if minor > MAX_AMOUNT {
        return Err(MoneyError::TooLarge);
    }
    Ok(minor)
}
