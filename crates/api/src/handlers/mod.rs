pub mod admin;
pub mod campaign;
pub mod donation;
pub mod notification;
pub mod task;

use fundbridge_core::money::cents_from_decimal;
use fundbridge_core::types::Cents;

use crate::error::AppResult;

/// Convert an optional decimal wire amount to cents.
pub(crate) fn optional_cents(amount: Option<f64>) -> AppResult<Option<Cents>> {
    Ok(amount.map(cents_from_decimal).transpose()?)
}
