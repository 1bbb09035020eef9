//! Payment provider HTTP client.
//!
//! [`HttpPaymentGateway`] speaks the provider's JSON dialect: amounts as
//! decimal strings, redirect confirmations, a `metadata.invoice_id`
//! correlation id, and an `Idempotence-Key` header so retried requests are
//! processed at most once.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::GatewayConfig;

/// Error type for provider call failures.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Provider returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// A 2xx response was missing an expected field.
    #[error("Provider response missing field: {0}")]
    MissingField(&'static str),
}

/// What the lifecycle manager asks the provider to charge.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// Price in kopecks.
    pub amount_kopecks: i64,
    /// Human-readable charge description (the product name).
    pub description: String,
    /// Correlation id; doubles as the provider idempotency key.
    pub idempotency_key: String,
}

/// A created provider payment.
#[derive(Debug, Clone)]
pub struct CreatedPayment {
    /// Provider-side payment object id (used for capture calls).
    pub provider_id: String,
    /// Checkout URL the buyer must be redirected to.
    pub confirmation_url: String,
}

/// External payment provider contract.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a redirect-confirmation payment.
    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<CreatedPayment, GatewayError>;

    /// Finalize a previously authorized charge.
    async fn capture(&self, provider_id: &str) -> Result<(), GatewayError>;
}

/// reqwest-backed [`PaymentGateway`] with a bounded per-request timeout.
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl HttpPaymentGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }
}

/// Format kopecks as the provider's `rubles.kk` decimal string.
fn format_amount(kopecks: i64) -> String {
    format!("{}.{:02}", kopecks / 100, kopecks % 100)
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<CreatedPayment, GatewayError> {
        let payload = serde_json::json!({
            "amount": {
                "value": format_amount(request.amount_kopecks),
                "currency": "RUB",
            },
            "confirmation": {
                "type": "redirect",
                "return_url": self.config.return_url,
            },
            "description": request.description,
            "metadata": {
                "invoice_id": request.idempotency_key,
            },
        });

        let response = self
            .client
            .post(&self.config.api_url)
            .basic_auth(&self.config.shop_id, Some(&self.config.secret_key))
            .header("Idempotence-Key", &request.idempotency_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response.json().await?;
        let provider_id = body["id"]
            .as_str()
            .ok_or(GatewayError::MissingField("id"))?
            .to_string();
        let confirmation_url = body["confirmation"]["confirmation_url"]
            .as_str()
            .ok_or(GatewayError::MissingField("confirmation.confirmation_url"))?
            .to_string();
        Ok(CreatedPayment {
            provider_id,
            confirmation_url,
        })
    }

    async fn capture(&self, provider_id: &str) -> Result<(), GatewayError> {
        let url = format!("{}/{provider_id}/capture", self.config.api_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.shop_id, Some(&self.config.secret_key))
            // Capture is a distinct operation, so it gets its own key.
            .header("Idempotence-Key", Uuid::new_v4().to_string())
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
