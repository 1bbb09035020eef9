//! Pure domain logic for the examly backend core.
//!
//! No I/O happens in this crate: shared id/timestamp aliases, the central
//! error taxonomy, phone/email identifier normalization, and password
//! hashing + strength policy. Service crates compose these with their
//! collaborators (TTL store, repositories, payment gateway).

pub mod error;
pub mod identifier;
pub mod password;
pub mod types;
