//! Purchase entity model and DTOs.

use std::fmt;
use std::str::FromStr;

use examly_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle status of a purchase.
///
/// `Created` is the only non-terminal state; webhook reconciliation moves a
/// record to `Paid` or `Canceled` and nothing moves it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseStatus {
    Created,
    Paid,
    Canceled,
}

impl PurchaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PurchaseStatus::Created => "Created",
            PurchaseStatus::Paid => "Paid",
            PurchaseStatus::Canceled => "Canceled",
        }
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(PurchaseStatus::Created),
            "Paid" => Ok(PurchaseStatus::Paid),
            "Canceled" => Ok(PurchaseStatus::Canceled),
            other => Err(format!("unknown purchase status: {other}")),
        }
    }
}

/// Full purchase row from the `purchases` table.
///
/// `status` is stored as text and constrained by a CHECK; use
/// [`Purchase::status`] for the typed view.
#[derive(Debug, Clone, FromRow)]
pub struct Purchase {
    pub id: DbId,
    pub user_id: DbId,
    pub product_id: DbId,
    /// Buyer email the receipt is sent to.
    pub email: String,
    /// Correlation id generated at intent creation; also the provider
    /// idempotency key.
    pub payment_id: String,
    pub status: String,
    pub paid_at: Option<Timestamp>,
    pub receipt_url: Option<String>,
    /// Last webhook body applied to this record, kept for audit.
    pub raw_payload: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Purchase {
    /// Typed view of the `status` column.
    pub fn status(&self) -> Result<PurchaseStatus, String> {
        self.status.parse()
    }
}

/// DTO for creating a purchase in `Created` state.
#[derive(Debug, Deserialize)]
pub struct CreatePurchase {
    pub user_id: DbId,
    pub product_id: DbId,
    pub email: String,
    pub payment_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrips_through_strings() {
        for status in [
            PurchaseStatus::Created,
            PurchaseStatus::Paid,
            PurchaseStatus::Canceled,
        ] {
            let parsed: PurchaseStatus = status.as_str().parse().expect("known status");
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("Refunded".parse::<PurchaseStatus>().is_err());
    }
}
