use crate::types::TokenKind;

/// Central error taxonomy for the credential and payment lifecycle engine.
///
/// Each variant carries enough context for the caller to render a precise
/// message (token kind, seconds remaining, current payment status). The
/// core never retries on its own; retry policy belongs to the caller.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A verification code was requested again inside the cooldown window.
    #[error("Code can be re-sent in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: i64 },

    /// The verification code record expired or was never issued.
    #[error("Verification code has expired or was not found")]
    CodeExpired,

    /// The submitted code does not match the stored one.
    #[error("Verification code is incorrect")]
    CodeInvalid,

    /// The workflow step requires a prior successful verification.
    #[error("Verification was not completed or has expired")]
    CodeNotVerified,

    /// Another account already owns the phone number or email.
    #[error("An account with this identifier already exists")]
    IdentifierTaken,

    /// No account owns the phone number or email.
    #[error("No account matches this identifier")]
    IdentifierNotFound,

    #[error("Missing {0} token")]
    TokenMissing(TokenKind),

    #[error("Expired {0} token")]
    TokenExpired(TokenKind),

    /// Bad signature, bad structure, or a token of the wrong kind.
    #[error("Invalid {0} token")]
    TokenInvalid(TokenKind),

    #[error("Password too weak: {0}")]
    PasswordTooWeak(String),

    /// Wrong current password, or the two submitted passwords differ.
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// A purchase for this (user, product) pair is already in flight or paid.
    #[error("A payment for this product already exists with status {0}")]
    PaymentAlreadyActive(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// The webhook payload is missing the correlation id or is not the
    /// shape the provider documents.
    #[error("Malformed webhook payload: {0}")]
    MalformedWebhook(String),

    /// The external payment provider rejected or failed a call.
    #[error("Payment provider error: {0}")]
    ProviderError(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// TTL store (Redis) failure.
    #[error("Ephemeral store error: {0}")]
    Store(String),

    /// Relational repository failure.
    #[error("Repository error: {0}")]
    Repo(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
