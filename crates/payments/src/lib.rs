//! Payment lifecycle: intent creation against an external provider and
//! reconciliation of the provider's asynchronous webhooks into locally
//! tracked purchase records.

pub mod config;
pub mod events;
pub mod gateway;
pub mod lifecycle;
pub mod store;
