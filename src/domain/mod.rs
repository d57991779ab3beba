//! File exchange domain: storage, expiry, payload decoding and messages
//!
//! Provides the business logic behind the HTTP endpoints, independent of axum.

pub mod messages;
pub mod payload;
pub mod store;
pub mod sweeper;
pub mod utils;
