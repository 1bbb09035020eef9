//! Dual-token (access/refresh) issuance, validation, and session
//! resolution.
//!
//! Both tokens are HS256-signed JWTs carrying the subject id, role flag,
//! and a kind tag. The two kinds are signed with different secrets, so a
//! leaked refresh secret cannot forge access tokens and vice versa. The
//! kind tag is checked on every validation -- signature validity alone
//! never qualifies a token for the wrong use.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use examly_core::error::CoreError;
use examly_core::types::{DbId, TokenKind};

use crate::config::TokenConfig;

/// JWT claims embedded in both token kinds.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the user's internal database id.
    pub sub: DbId,
    /// Elevated-role flag.
    pub is_superuser: bool,
    /// Which token this is; checked on every validation.
    pub kind: TokenKind,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier (UUID v4) for audit.
    pub jti: String,
}

/// A freshly issued access/refresh pair, as opaque strings.
///
/// The API layer carries these as HTTP-only cookies; token content does
/// not depend on the transport.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Result of resolving a session from transport tokens.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    /// Claims of the access token the session now rests on.
    pub claims: Claims,
    /// A replacement access token minted from the refresh token, present
    /// when the supplied access token had expired. The caller must
    /// re-issue it to the transport.
    pub refreshed_access: Option<String>,
}

fn secret_for(kind: TokenKind, config: &TokenConfig) -> &[u8] {
    match kind {
        TokenKind::Access => config.access_secret.as_bytes(),
        TokenKind::Refresh => config.refresh_secret.as_bytes(),
    }
}

fn expiry_secs(kind: TokenKind, config: &TokenConfig) -> i64 {
    match kind {
        TokenKind::Access => config.access_expiry_mins * 60,
        TokenKind::Refresh => config.refresh_expiry_days * 24 * 3600,
    }
}

/// Mint a single token of the given kind, returning it with its claims.
fn mint(
    user_id: DbId,
    is_superuser: bool,
    kind: TokenKind,
    config: &TokenConfig,
) -> Result<(String, Claims), CoreError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        is_superuser,
        kind,
        exp: now + expiry_secs(kind, config),
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    let token = encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(secret_for(kind, config)),
    )
    .map_err(|e| CoreError::Internal(format!("token encoding failed: {e}")))?;
    Ok((token, claims))
}

/// Issue an access + refresh pair for the given identity.
pub fn issue_pair(
    user_id: DbId,
    is_superuser: bool,
    config: &TokenConfig,
) -> Result<TokenPair, CoreError> {
    let (access, _) = mint(user_id, is_superuser, TokenKind::Access, config)?;
    let (refresh, _) = mint(user_id, is_superuser, TokenKind::Refresh, config)?;
    Ok(TokenPair { access, refresh })
}

/// Validate a token against the expected kind and return its claims.
///
/// Expiry is checked with zero leeway so a token is rejected the second it
/// lapses. Errors: [`CoreError::TokenExpired`] past expiry,
/// [`CoreError::TokenInvalid`] for a bad signature, bad structure, or a
/// kind-tag mismatch.
pub fn validate(
    token: &str,
    expected: TokenKind,
    config: &TokenConfig,
) -> Result<Claims, CoreError> {
    let mut validation = Validation::default(); // HS256, validates exp
    validation.leeway = 0;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret_for(expected, config)),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => CoreError::TokenExpired(expected),
        _ => CoreError::TokenInvalid(expected),
    })?;

    if token_data.claims.kind != expected {
        return Err(CoreError::TokenInvalid(expected));
    }
    Ok(token_data.claims)
}

/// Mint a fresh access token from a valid refresh token.
pub fn refresh_access(refresh_token: &str, config: &TokenConfig) -> Result<String, CoreError> {
    let claims = validate(refresh_token, TokenKind::Refresh, config)?;
    let (access, _) = mint(claims.sub, claims.is_superuser, TokenKind::Access, config)?;
    Ok(access)
}

/// Resolve transport tokens to identity claims.
///
/// A missing access token fails immediately without consulting the
/// refresh token. An expired access token escalates to the refresh token,
/// which mints a replacement access token returned in
/// [`ResolvedSession::refreshed_access`]. An invalid token of either kind
/// fails hard -- there is no silent fallback from a bad access token to
/// the refresh token.
pub fn resolve_session(
    access: Option<&str>,
    refresh: Option<&str>,
    config: &TokenConfig,
) -> Result<ResolvedSession, CoreError> {
    let Some(access) = access else {
        return Err(CoreError::TokenMissing(TokenKind::Access));
    };

    match validate(access, TokenKind::Access, config) {
        Ok(claims) => Ok(ResolvedSession {
            claims,
            refreshed_access: None,
        }),
        Err(CoreError::TokenExpired(_)) => {
            let Some(refresh) = refresh else {
                return Err(CoreError::TokenMissing(TokenKind::Refresh));
            };
            let refresh_claims = validate(refresh, TokenKind::Refresh, config)?;
            let (new_access, claims) = mint(
                refresh_claims.sub,
                refresh_claims.is_superuser,
                TokenKind::Access,
                config,
            )?;
            Ok(ResolvedSession {
                claims,
                refreshed_access: Some(new_access),
            })
        }
        Err(e) => Err(e),
    }
}
