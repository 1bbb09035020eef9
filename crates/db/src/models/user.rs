//! User entity model and DTOs.

use examly_core::types::{DbId, Timestamp};
use serde::Deserialize;
use sqlx::FromRow;

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses
/// directly.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    /// Canonical E.164 phone number, when the account has one.
    pub phone: Option<String>,
    /// Lowercased email address, when the account has one.
    pub email: Option<String>,
    pub password_hash: String,
    pub is_superuser: bool,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub grade: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new user.
///
/// At least one of `phone`/`email` must be set; the database CHECK
/// constraint rejects rows with neither.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub password_hash: String,
}

/// DTO for updating profile fields. All fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateUserProfile {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub grade: Option<i32>,
}
