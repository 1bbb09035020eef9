//! Credential workflow state machines.
//!
//! Registration (`Unverified -> CodeSent -> Verified -> Registered`),
//! password reset (`CodeSent -> Verified -> PasswordSet`), authenticated
//! password change, and login. Each workflow composes the token service,
//! the verification-code service, and the user store; none of them holds
//! any state of its own.

use std::sync::Arc;

use examly_core::error::CoreError;
use examly_core::identifier::Identifier;
use examly_core::password::{hash_password, validate_password_strength, verify_password};

use crate::config::TokenConfig;
use crate::otp::{OtpAction, OtpService};
use crate::token::{self, TokenPair};
use crate::users::{NewUser, UserRecord, UserStore};

/// Input for the registration commit step.
///
/// Phone and email are both optional but at least one must be present; when
/// both are given, each must have been independently verified.
#[derive(Debug, Clone)]
pub struct RegistrationInput {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub password: String,
    pub password_repeat: String,
}

/// Composes the token and verification services with the user store.
pub struct CredentialFlows {
    users: Arc<dyn UserStore>,
    otp: OtpService,
    tokens: TokenConfig,
}

impl CredentialFlows {
    pub fn new(users: Arc<dyn UserStore>, otp: OtpService, tokens: TokenConfig) -> Self {
        Self { users, otp, tokens }
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// First registration step: deliver a code to a free identifier.
    ///
    /// The ownership check runs before the rate limiter, so a taken
    /// identifier reports [`CoreError::IdentifierTaken`] even inside the
    /// cooldown window.
    pub async fn send_registration_code(&self, identifier: &Identifier) -> Result<(), CoreError> {
        if self.users.find_by_identifier(identifier).await?.is_some() {
            return Err(CoreError::IdentifierTaken);
        }
        self.otp.send(identifier, OtpAction::Registration).await
    }

    /// Second step: check a submitted code. Repeatable until consumed.
    pub async fn verify_registration_code(
        &self,
        identifier: &Identifier,
        code: &str,
    ) -> Result<(), CoreError> {
        self.otp
            .verify(identifier, OtpAction::Registration, code)
            .await
    }

    /// Final step: create the account.
    ///
    /// Identifier ownership is re-checked here so a registration that
    /// raced another one surfaces as [`CoreError::IdentifierTaken`]; the
    /// database unique constraint is the authoritative guard behind the
    /// re-check. Verification records are consumed only after the row is
    /// committed.
    pub async fn register(&self, input: RegistrationInput) -> Result<UserRecord, CoreError> {
        let identifiers = parse_identifiers(input.phone.as_deref(), input.email.as_deref())?;

        for identifier in &identifiers {
            if self.users.find_by_identifier(identifier).await?.is_some() {
                return Err(CoreError::IdentifierTaken);
            }
            if !self
                .otp
                .is_verified(identifier, OtpAction::Registration)
                .await?
            {
                return Err(CoreError::CodeNotVerified);
            }
        }

        if input.password != input.password_repeat {
            return Err(CoreError::PasswordMismatch);
        }
        validate_password_strength(&input.password)?;
        let password_hash = hash_password(&input.password)?;

        let mut new_user = NewUser {
            phone: None,
            email: None,
            password_hash,
        };
        for identifier in &identifiers {
            match identifier {
                Identifier::Phone(phone) => new_user.phone = Some(phone.clone()),
                Identifier::Email(email) => new_user.email = Some(email.clone()),
            }
        }
        let user = self.users.create(new_user).await?;

        for identifier in &identifiers {
            self.otp.consume(identifier, OtpAction::Registration).await?;
        }
        tracing::info!(user_id = user.id, "Registration completed");
        Ok(user)
    }

    // -----------------------------------------------------------------------
    // Password reset
    // -----------------------------------------------------------------------

    /// First reset step: deliver a code to an identifier that owns an
    /// account.
    pub async fn send_reset_code(&self, identifier: &Identifier) -> Result<(), CoreError> {
        if self.users.find_by_identifier(identifier).await?.is_none() {
            return Err(CoreError::IdentifierNotFound);
        }
        self.otp.send(identifier, OtpAction::Reset).await
    }

    /// Second step: check a reset code.
    ///
    /// Runs the code check without any account lookup, so neither the
    /// result nor the timing distinguishes "no such user" from "wrong
    /// code"; existence is only reported by
    /// [`Self::set_password_after_reset`].
    pub async fn verify_reset_code(
        &self,
        identifier: &Identifier,
        code: &str,
    ) -> Result<(), CoreError> {
        self.otp.verify(identifier, OtpAction::Reset, code).await
    }

    /// Final step: set the new password and consume the verification, so a
    /// reset cannot be replayed.
    pub async fn set_password_after_reset(
        &self,
        identifier: &Identifier,
        new_password: &str,
    ) -> Result<(), CoreError> {
        if !self.otp.is_verified(identifier, OtpAction::Reset).await? {
            return Err(CoreError::CodeNotVerified);
        }
        let user = self
            .users
            .find_by_identifier(identifier)
            .await?
            .ok_or(CoreError::IdentifierNotFound)?;

        validate_password_strength(new_password)?;
        let password_hash = hash_password(new_password)?;
        self.users.set_password_hash(user.id, &password_hash).await?;

        self.otp.consume(identifier, OtpAction::Reset).await?;
        tracing::info!(user_id = user.id, "Password reset completed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Authenticated password change
    // -----------------------------------------------------------------------

    /// Change the password of the authenticated user.
    ///
    /// Resolves the session from the transport tokens, re-checks the
    /// current password, and applies the same strength policy as
    /// registration. Returns the replacement access token when the session
    /// was resolved through the refresh token, for the caller to re-issue.
    pub async fn change_password(
        &self,
        access: Option<&str>,
        refresh: Option<&str>,
        current_password: &str,
        new_password: &str,
    ) -> Result<Option<String>, CoreError> {
        let session = token::resolve_session(access, refresh, &self.tokens)?;
        let user = self
            .users
            .find_by_id(session.claims.sub)
            .await?
            .ok_or(CoreError::IdentifierNotFound)?;

        if !verify_password(current_password, &user.password_hash)? {
            return Err(CoreError::PasswordMismatch);
        }
        validate_password_strength(new_password)?;
        let password_hash = hash_password(new_password)?;
        self.users.set_password_hash(user.id, &password_hash).await?;

        tracing::info!(user_id = user.id, "Password changed");
        Ok(session.refreshed_access)
    }

    // -----------------------------------------------------------------------
    // Login
    // -----------------------------------------------------------------------

    /// Authenticate by identifier + password and issue a token pair.
    ///
    /// An unknown identifier reports the same error as a wrong password so
    /// login cannot be used to probe which accounts exist.
    pub async fn login(
        &self,
        identifier: &Identifier,
        password: &str,
    ) -> Result<TokenPair, CoreError> {
        let Some(user) = self.users.find_by_identifier(identifier).await? else {
            return Err(CoreError::PasswordMismatch);
        };
        if !verify_password(password, &user.password_hash)? {
            return Err(CoreError::PasswordMismatch);
        }
        token::issue_pair(user.id, user.is_superuser, &self.tokens)
    }
}

/// Parse the optional phone/email inputs; at least one must be present.
fn parse_identifiers(
    phone: Option<&str>,
    email: Option<&str>,
) -> Result<Vec<Identifier>, CoreError> {
    let mut identifiers = Vec::new();
    if let Some(phone) = phone {
        identifiers.push(Identifier::phone(phone)?);
    }
    if let Some(email) = email {
        identifiers.push(Identifier::email(email)?);
    }
    if identifiers.is_empty() {
        return Err(CoreError::Validation(
            "either a phone number or an email is required".into(),
        ));
    }
    Ok(identifiers)
}
