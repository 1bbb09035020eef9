//! Payment gateway configuration.

/// Default per-request timeout for provider calls, in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Configuration for the payment provider HTTP client.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Provider shop/account id (basic auth username).
    pub shop_id: String,
    /// Provider API secret (basic auth password). Never log this.
    pub secret_key: String,
    /// Payments API endpoint, e.g. `https://api.yookassa.ru/v3/payments`.
    pub api_url: String,
    /// URL the buyer is sent back to after checkout.
    pub return_url: String,
    /// Per-request timeout in seconds (default: 10).
    pub request_timeout_secs: u64,
}

impl GatewayConfig {
    /// Load gateway configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `PAYMENT_SHOP_ID`          | **yes**  | --      |
    /// | `PAYMENT_SECRET_KEY`       | **yes**  | --      |
    /// | `PAYMENT_API_URL`          | **yes**  | --      |
    /// | `PAYMENT_RETURN_URL`       | **yes**  | --      |
    /// | `PAYMENT_TIMEOUT_SECS`     | no       | `10`    |
    ///
    /// # Panics
    ///
    /// Panics if a required variable is unset.
    pub fn from_env() -> Self {
        let shop_id = std::env::var("PAYMENT_SHOP_ID")
            .expect("PAYMENT_SHOP_ID must be set in the environment");
        let secret_key = std::env::var("PAYMENT_SECRET_KEY")
            .expect("PAYMENT_SECRET_KEY must be set in the environment");
        let api_url = std::env::var("PAYMENT_API_URL")
            .expect("PAYMENT_API_URL must be set in the environment");
        let return_url = std::env::var("PAYMENT_RETURN_URL")
            .expect("PAYMENT_RETURN_URL must be set in the environment");

        let request_timeout_secs: u64 = std::env::var("PAYMENT_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_REQUEST_TIMEOUT_SECS.to_string())
            .parse()
            .expect("PAYMENT_TIMEOUT_SECS must be a valid u64");

        Self {
            shop_id,
            secret_key,
            api_url,
            return_url,
            request_timeout_secs,
        }
    }
}
