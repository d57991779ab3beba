//! HTTP transport layer for the file exchange
//!
//! Provides the handlers behind the JSON API, file downloads and the static client pages.

pub mod assets;
pub mod handlers;
