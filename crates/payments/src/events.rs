//! Webhook payload parsing.
//!
//! The provider posts notifications shaped like:
//!
//! ```json
//! {
//!   "event": "payment.succeeded",
//!   "object": {
//!     "id": "2c1f3b8e-000f-5000-8000-1a2b3c4d5e6f",
//!     "paid_at": "2026-03-01T12:00:00.000Z",
//!     "receipt_url": "https://provider.example/receipts/1",
//!     "metadata": { "invoice_id": "..." }
//!   }
//! }
//! ```
//!
//! Only `object.metadata.invoice_id` is mandatory: it correlates the
//! notification with the local purchase record. A missing event type is
//! left empty and handled as "unknown" by the dispatcher.

use chrono::{DateTime, NaiveDateTime, Utc};

use examly_core::error::CoreError;
use examly_core::types::Timestamp;

/// A parsed webhook notification.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Provider event type, empty when absent.
    pub event: String,
    /// Provider-side payment object id (needed for capture calls).
    pub provider_id: Option<String>,
    /// Correlation id assigned at intent creation.
    pub invoice_id: String,
    pub paid_at: Option<Timestamp>,
    pub receipt_url: Option<String>,
}

/// Extract the fields the reconciler needs from a raw webhook body.
///
/// Fails with [`CoreError::MalformedWebhook`] only when the correlation id
/// is missing -- without it the notification cannot be matched to
/// anything.
pub fn parse_webhook(payload: &serde_json::Value) -> Result<WebhookEvent, CoreError> {
    let object = &payload["object"];

    let invoice_id = object["metadata"]["invoice_id"]
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            CoreError::MalformedWebhook("missing object.metadata.invoice_id".into())
        })?
        .to_string();

    let event = payload["event"].as_str().unwrap_or_default().to_string();
    let provider_id = object["id"].as_str().map(str::to_string);
    let paid_at = object["paid_at"].as_str().and_then(parse_paid_at);
    let receipt_url = object["receipt_url"].as_str().map(str::to_string);

    Ok(WebhookEvent {
        event,
        provider_id,
        invoice_id,
        paid_at,
        receipt_url,
    })
}

/// Parse a provider timestamp.
///
/// Providers have shipped both RFC 3339 (`2026-03-01T12:00:00.000Z`) and a
/// plain `YYYY-MM-DD HH:MM:SS` form; both are accepted and read as UTC.
fn parse_paid_at(raw: &str) -> Option<Timestamp> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
