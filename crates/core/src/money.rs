//! Currency helpers.
//!
//! Amounts are carried as integer cents ([`Cents`]) everywhere inside the
//! system; decimal values only exist at the wire boundary.

use crate::error::CoreError;
use crate::types::Cents;

/// Tolerance when checking that a decimal amount has at most two places.
const DECIMAL_EPSILON: f64 = 1e-6;

/// Largest accepted single amount (ten million in major units).
pub const MAX_AMOUNT_CENTS: Cents = 1_000_000_000;

/// Convert a decimal wire amount (e.g. `12.5`) into cents.
///
/// Rejects negative, non-finite, and over-precise values.
pub fn cents_from_decimal(amount: f64) -> Result<Cents, CoreError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(CoreError::Validation(format!(
            "Amount must be a non-negative number, got {amount}"
        )));
    }
    let scaled = amount * 100.0;
    let rounded = scaled.round();
    if (scaled - rounded).abs() > DECIMAL_EPSILON {
        return Err(CoreError::Validation(format!(
            "Amount {amount} has more than two decimal places"
        )));
    }
    if rounded > MAX_AMOUNT_CENTS as f64 {
        return Err(CoreError::Validation(format!(
            "Amount {amount} exceeds the maximum of {}",
            format_cents(MAX_AMOUNT_CENTS)
        )));
    }
    Ok(rounded as Cents)
}

/// Render cents as a two-decimal string, e.g. `123456` -> `"1234.56"`.
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Require a strictly positive amount.
pub fn validate_positive(amount: Cents, field: &str) -> Result<(), CoreError> {
    if amount <= 0 {
        return Err(CoreError::Validation(format!(
            "{field} must be greater than zero"
        )));
    }
    if amount > MAX_AMOUNT_CENTS {
        return Err(CoreError::Validation(format!(
            "{field} exceeds the maximum of {}",
            format_cents(MAX_AMOUNT_CENTS)
        )));
    }
    Ok(())
}
