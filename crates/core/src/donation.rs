//! Donation payment statuses, receipt numbers, and input validation.

use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::money::{format_cents, validate_positive};
use crate::types::Cents;

/// Receipt number prefix.
pub const RECEIPT_PREFIX: &str = "RCP";

/// Number of random base36 characters in a receipt number.
pub const RECEIPT_RANDOM_LEN: usize = 6;

/// How many times a receipt number is regenerated after a uniqueness clash.
pub const MAX_RECEIPT_ATTEMPTS: usize = 5;

/// Maximum length of a refund reason.
pub const MAX_REFUND_REASON_LENGTH: usize = 2_000;

const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Payment status reported by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
    Disputed,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::Disputed => "disputed",
        }
    }

    /// Forward-only processor transitions. Refunds go through the refund
    /// operation, never through a bare status change.
    pub fn can_transition_to(self, next: Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Completed)
                | (Pending, Failed)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Completed, Disputed)
                | (Disputed, Completed)
        )
    }

    /// Statuses a new donation may be recorded with.
    pub fn is_valid_initial(self) -> bool {
        matches!(self, Self::Pending | Self::Processing | Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the donor paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    BankTransfer,
    MobileMoney,
    Wallet,
    /// Manual entry by an administrator (cash, cheque, pledge paid offline).
    Offline,
}

/// Snapshot stored in place of a donor reference for anonymous gifts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymousDonor {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

/// Generate `RCP-<YYYYMMDD>-<6 base36 chars>`.
pub fn generate_receipt_number(date: NaiveDate) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..RECEIPT_RANDOM_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("{RECEIPT_PREFIX}-{}-{suffix}", date.format("%Y%m%d"))
}

/// Check a receipt number against the `RCP-<YYYYMMDD>-<6 chars>` format.
pub fn is_valid_receipt_number(receipt: &str) -> bool {
    let mut parts = receipt.split('-');
    let (Some(prefix), Some(date), Some(suffix), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    prefix == RECEIPT_PREFIX
        && NaiveDate::parse_from_str(date, "%Y%m%d").is_ok()
        && date.len() == 8
        && suffix.len() == RECEIPT_RANDOM_LEN
        && suffix.bytes().all(|b| BASE36.contains(&b))
}

/// `amount - fee`.
pub fn net_amount(amount_cents: Cents, fee_cents: Cents) -> Cents {
    amount_cents - fee_cents
}

/// Validate a donation's amount and processor fee.
pub fn validate_amount_and_fee(amount_cents: Cents, fee_cents: Cents) -> Result<(), CoreError> {
    validate_positive(amount_cents, "Donation amount")?;
    if fee_cents < 0 || fee_cents > amount_cents {
        return Err(CoreError::Validation(format!(
            "Transaction fee {} must be between 0 and the donation amount {}",
            format_cents(fee_cents),
            format_cents(amount_cents)
        )));
    }
    Ok(())
}

/// Validate a refund request against the donation it targets.
pub fn validate_refund(
    donation_amount: Cents,
    refund_amount: Cents,
    reason: &str,
) -> Result<(), CoreError> {
    validate_positive(refund_amount, "Refund amount")?;
    if refund_amount > donation_amount {
        return Err(CoreError::Validation(format!(
            "Refund amount {} exceeds the donation amount {}",
            format_cents(refund_amount),
            format_cents(donation_amount)
        )));
    }
    if reason.trim().is_empty() {
        return Err(CoreError::Validation("A refund reason is required".into()));
    }
    if reason.chars().count() > MAX_REFUND_REASON_LENGTH {
        return Err(CoreError::Validation(format!(
            "Refund reason exceeds {MAX_REFUND_REASON_LENGTH} characters"
        )));
    }
    Ok(())
}

/// External payment ids are the idempotency key and must be non-blank.
pub fn validate_external_payment_id(id: &str) -> Result<(), CoreError> {
    if id.trim().is_empty() {
        return Err(CoreError::Validation(
            "External payment id must not be empty".into(),
        ));
    }
    if id.len() > 255 {
        return Err(CoreError::Validation(
            "External payment id exceeds 255 characters".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    #[test]
    fn receipt_number_has_expected_shape() {
        let receipt = generate_receipt_number(day());
        assert!(receipt.starts_with("RCP-20260314-"), "got {receipt}");
        assert_eq!(receipt.len(), "RCP-20260314-".len() + RECEIPT_RANDOM_LEN);
        assert!(is_valid_receipt_number(&receipt));
    }

    #[test]
    fn malformed_receipts_are_rejected() {
        assert!(!is_valid_receipt_number("RCP-2026031-ABCDEF"));
        assert!(!is_valid_receipt_number("RCX-20260314-ABCDEF"));
        assert!(!is_valid_receipt_number("RCP-20260314-ABCDE"));
        assert!(!is_valid_receipt_number("RCP-20260314-abcdef"));
        assert!(!is_valid_receipt_number("RCP-20261399-ABCDEF"));
        assert!(!is_valid_receipt_number("RCP-20260314-ABCDEF-1"));
    }

    #[test]
    fn random_suffixes_rarely_collide() {
        // 36^6 possibilities; a handful of clashes in 10k is within the
        // retry budget, but the bulk must be distinct.
        let receipts: HashSet<String> =
            (0..10_000).map(|_| generate_receipt_number(day())).collect();
        assert!(receipts.len() > 9_990);
    }

    #[test]
    fn payment_status_never_moves_backward() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Refunded.can_transition_to(Completed));
        assert!(!Failed.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Disputed));
    }

    #[test]
    fn refunded_is_not_a_valid_initial_status() {
        assert!(!PaymentStatus::Refunded.is_valid_initial());
        assert!(!PaymentStatus::Disputed.is_valid_initial());
        assert!(PaymentStatus::Completed.is_valid_initial());
    }

    #[test]
    fn fee_must_fit_inside_amount() {
        assert!(validate_amount_and_fee(1000, 30).is_ok());
        assert!(validate_amount_and_fee(1000, 1000).is_ok());
        assert!(validate_amount_and_fee(1000, 1001).is_err());
        assert!(validate_amount_and_fee(1000, -1).is_err());
        assert!(validate_amount_and_fee(0, 0).is_err());
    }

    #[test]
    fn net_amount_subtracts_fee() {
        assert_eq!(net_amount(10_000, 320), 9_680);
    }

    #[test]
    fn refund_validation() {
        assert!(validate_refund(5_000, 5_000, "duplicate charge").is_ok());
        assert!(validate_refund(5_000, 5_001, "too much").is_err());
        assert!(validate_refund(5_000, 0, "zero").is_err());
        assert!(validate_refund(5_000, 100, "  ").is_err());
    }

    #[test]
    fn blank_external_payment_id_rejected() {
        assert!(validate_external_payment_id("pi_123").is_ok());
        assert!(validate_external_payment_id(" ").is_err());
    }
}
