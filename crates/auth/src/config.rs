//! Configuration for the token and verification-code services.

/// Configuration for JWT token generation and validation.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// HMAC-SHA256 secret used to sign and verify access tokens.
    pub access_secret: String,
    /// HMAC-SHA256 secret used to sign and verify refresh tokens.
    ///
    /// Must differ from `access_secret` so compromise of one secret does
    /// not allow forging the other token kind.
    pub refresh_secret: String,
    /// Access token lifetime in minutes (default: 15).
    pub access_expiry_mins: i64,
    /// Refresh token lifetime in days (default: 7).
    pub refresh_expiry_days: i64,
}

/// Default access token expiry in minutes.
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;
/// Default refresh token expiry in days.
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 7;

impl TokenConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `JWT_ACCESS_SECRET`        | **yes**  | --      |
    /// | `JWT_REFRESH_SECRET`       | **yes**  | --      |
    /// | `JWT_ACCESS_EXPIRY_MINS`   | no       | `15`    |
    /// | `JWT_REFRESH_EXPIRY_DAYS`  | no       | `7`     |
    ///
    /// # Panics
    ///
    /// Panics if either secret is unset, empty, or if both are equal.
    pub fn from_env() -> Self {
        let access_secret = std::env::var("JWT_ACCESS_SECRET")
            .expect("JWT_ACCESS_SECRET must be set in the environment");
        let refresh_secret = std::env::var("JWT_REFRESH_SECRET")
            .expect("JWT_REFRESH_SECRET must be set in the environment");
        assert!(!access_secret.is_empty(), "JWT_ACCESS_SECRET must not be empty");
        assert!(!refresh_secret.is_empty(), "JWT_REFRESH_SECRET must not be empty");
        assert_ne!(
            access_secret, refresh_secret,
            "JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ"
        );

        let access_expiry_mins: i64 = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");

        let refresh_expiry_days: i64 = std::env::var("JWT_REFRESH_EXPIRY_DAYS")
            .unwrap_or_else(|_| DEFAULT_REFRESH_EXPIRY_DAYS.to_string())
            .parse()
            .expect("JWT_REFRESH_EXPIRY_DAYS must be a valid i64");

        Self {
            access_secret,
            refresh_secret,
            access_expiry_mins,
            refresh_expiry_days,
        }
    }
}

/// Timing knobs for the verification-code service.
#[derive(Debug, Clone)]
pub struct OtpConfig {
    /// Cooldown between code sends for the same identifier, in seconds.
    pub resend_cooldown_secs: u64,
    /// Lifetime of a pending code, in seconds.
    pub code_ttl_secs: u64,
    /// Lifetime of the verified flag, in seconds. Longer than the code
    /// itself so the user can finish the workflow after verifying.
    pub verified_ttl_secs: u64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            resend_cooldown_secs: 120,
            code_ttl_secs: 120,
            verified_ttl_secs: 300,
        }
    }
}

impl OtpConfig {
    /// Load OTP configuration from environment variables.
    ///
    /// | Env Var                    | Default |
    /// |----------------------------|---------|
    /// | `OTP_RESEND_COOLDOWN_SECS` | `120`   |
    /// | `OTP_CODE_TTL_SECS`        | `120`   |
    /// | `OTP_VERIFIED_TTL_SECS`    | `300`   |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let parse_var = |name: &str, default: u64| -> u64 {
            std::env::var(name)
                .unwrap_or_else(|_| default.to_string())
                .parse()
                .unwrap_or_else(|_| panic!("{name} must be a valid u64"))
        };

        Self {
            resend_cooldown_secs: parse_var("OTP_RESEND_COOLDOWN_SECS", defaults.resend_cooldown_secs),
            code_ttl_secs: parse_var("OTP_CODE_TTL_SECS", defaults.code_ttl_secs),
            verified_ttl_secs: parse_var("OTP_VERIFIED_TTL_SECS", defaults.verified_ttl_secs),
        }
    }
}
