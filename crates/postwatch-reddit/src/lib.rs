//! Reddit implementation of [`PlatformGateway`](postwatch_core::gateway::PlatformGateway).
//!
//! Authenticates with an application-only OAuth2 token, pages through
//! `/r/<community>/new`, looks single posts up through `/api/info`, and
//! sleeps through Reddit's rate-limit windows before giving up.

mod client;
mod listing;
mod ratelimit;

pub mod config;
pub mod error;

pub use client::RedditGateway;
pub use config::RedditConfig;
pub use error::{Error, Result};

#[cfg(test)]
mod tests;
