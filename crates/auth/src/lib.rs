//! Credential services: dual-token sessions, one-time verification codes,
//! and the registration / password-reset / password-change workflows.
//!
//! The API layer drives these services and owns transport concerns
//! (cookies, status codes); nothing here calls back into it.

pub mod config;
pub mod flows;
pub mod notifier;
pub mod otp;
pub mod token;
pub mod users;
