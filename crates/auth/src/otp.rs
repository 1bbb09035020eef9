//! One-time verification codes: issuance, rate limiting, and checking.
//!
//! Keys in the TTL store, per action and canonical identifier:
//!
//! ```text
//! rate_limit_{action}:{identifier}      -> resend cooldown marker
//! {action}:code:{identifier}            -> the pending 4-digit code
//! {action}:code_verified:{identifier}   -> "true" once the code matched
//! ```
//!
//! The rate-limit marker is the only concurrency mechanism: two concurrent
//! sends can both pass the TTL check in a narrow window, in which case the
//! second code overwrites the first. That is a nuisance, not a correctness
//! violation.

use std::sync::Arc;

use rand::Rng;

use examly_core::error::CoreError;
use examly_core::identifier::Identifier;
use examly_store::{StoreError, TtlStore};

use crate::config::OtpConfig;
use crate::notifier::Notifier;

/// The workflow a verification code belongs to.
///
/// Codes and flags are namespaced by action, so a registration code can
/// never satisfy a password-reset check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpAction {
    Registration,
    Reset,
}

impl OtpAction {
    pub fn as_str(self) -> &'static str {
        match self {
            OtpAction::Registration => "registration",
            OtpAction::Reset => "reset",
        }
    }
}

impl std::fmt::Display for OtpAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generates, rate-limits, delivers, and checks one-time codes.
pub struct OtpService {
    store: Arc<dyn TtlStore>,
    notifier: Arc<dyn Notifier>,
    config: OtpConfig,
}

fn store_err(e: StoreError) -> CoreError {
    CoreError::Store(e.to_string())
}

impl OtpService {
    pub fn new(store: Arc<dyn TtlStore>, notifier: Arc<dyn Notifier>, config: OtpConfig) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    fn rate_limit_key(identifier: &Identifier, action: OtpAction) -> String {
        format!("rate_limit_{}:{}", action.as_str(), identifier.as_str())
    }

    fn code_key(identifier: &Identifier, action: OtpAction) -> String {
        format!("{}:code:{}", action.as_str(), identifier.as_str())
    }

    fn verified_key(identifier: &Identifier, action: OtpAction) -> String {
        format!("{}:code_verified:{}", action.as_str(), identifier.as_str())
    }

    /// Generate a code and hand it to the notifier.
    ///
    /// Fails with [`CoreError::RateLimited`] while the cooldown marker from
    /// a previous send is still alive. Delivery failures are logged, not
    /// surfaced: the code is in the store and can be retried after the
    /// cooldown.
    pub async fn send(&self, identifier: &Identifier, action: OtpAction) -> Result<(), CoreError> {
        let limit_key = Self::rate_limit_key(identifier, action);
        let remaining = self.store.ttl(&limit_key).await.map_err(store_err)?;
        if remaining > 0 {
            return Err(CoreError::RateLimited {
                retry_after_secs: remaining,
            });
        }
        self.store
            .set(&limit_key, "1", self.config.resend_cooldown_secs)
            .await
            .map_err(store_err)?;

        let code = generate_code();
        self.store
            .set(
                &Self::code_key(identifier, action),
                &code,
                self.config.code_ttl_secs,
            )
            .await
            .map_err(store_err)?;

        let delivery = match identifier {
            Identifier::Phone(phone) => self.notifier.send_sms(phone, &code).await,
            Identifier::Email(address) => self.notifier.send_email(address, &code).await,
        };
        if let Err(e) = delivery {
            tracing::warn!(
                identifier = %identifier,
                action = %action,
                error = %e,
                "Verification code delivery failed"
            );
        }
        Ok(())
    }

    /// Check a submitted code against the stored one.
    ///
    /// On match, sets the verified flag and returns Ok. The code record is
    /// kept until [`Self::consume`], so re-verifying before the workflow
    /// finishes stays idempotent.
    pub async fn verify(
        &self,
        identifier: &Identifier,
        action: OtpAction,
        submitted: &str,
    ) -> Result<(), CoreError> {
        let stored = self
            .store
            .get(&Self::code_key(identifier, action))
            .await
            .map_err(store_err)?;
        let Some(stored) = stored else {
            return Err(CoreError::CodeExpired);
        };

        // Compared as strings: codes are generated without leading zeros,
        // but a numeric compare would silently mask them if that changed.
        if stored != submitted {
            return Err(CoreError::CodeInvalid);
        }

        self.store
            .set(
                &Self::verified_key(identifier, action),
                "true",
                self.config.verified_ttl_secs,
            )
            .await
            .map_err(store_err)?;
        Ok(())
    }

    /// Whether a successful verification is still in effect.
    pub async fn is_verified(
        &self,
        identifier: &Identifier,
        action: OtpAction,
    ) -> Result<bool, CoreError> {
        let flag = self
            .store
            .get(&Self::verified_key(identifier, action))
            .await
            .map_err(store_err)?;
        Ok(flag.as_deref() == Some("true"))
    }

    /// Drop the code and verified flag.
    ///
    /// Called exactly once, after the dependent workflow step has durably
    /// committed, so a consumed verification cannot be replayed.
    pub async fn consume(
        &self,
        identifier: &Identifier,
        action: OtpAction,
    ) -> Result<(), CoreError> {
        self.store
            .delete(&Self::code_key(identifier, action))
            .await
            .map_err(store_err)?;
        self.store
            .delete(&Self::verified_key(identifier, action))
            .await
            .map_err(store_err)?;
        Ok(())
    }
}

/// Uniformly random 4-digit code.
fn generate_code() -> String {
    rand::rng().random_range(1000..=9999).to_string()
}
