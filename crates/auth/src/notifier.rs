//! Outbound code delivery seam.
//!
//! Delivery is fire-and-forget from the verification service's point of
//! view: a failed SMS or email is logged, the code stays in the store, and
//! the user retries after the cooldown.

use async_trait::async_trait;

/// Error type for delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    /// The gateway rejected or failed the delivery.
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Delivers verification codes through an external SMS/email gateway.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_sms(&self, phone_e164: &str, code: &str) -> Result<(), NotifierError>;
    async fn send_email(&self, address: &str, code: &str) -> Result<(), NotifierError>;
}

/// Development notifier that logs the code instead of delivering it.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send_sms(&self, phone_e164: &str, code: &str) -> Result<(), NotifierError> {
        tracing::info!(phone = %phone_e164, code, "SMS verification code (dev delivery)");
        Ok(())
    }

    async fn send_email(&self, address: &str, code: &str) -> Result<(), NotifierError> {
        tracing::info!(email = %address, code, "Email verification code (dev delivery)");
        Ok(())
    }
}
