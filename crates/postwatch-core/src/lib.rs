//! Core types and trait definitions for the postwatch monitor.
//!
//! This crate is free of HTTP and database dependencies. Storage backends
//! implement [`store::MonitoringStore`], platform clients implement
//! [`gateway::PlatformGateway`], and [`cycle::run_cycle`] ties the two
//! together.

pub mod cycle;
pub mod error;
pub mod gateway;
pub mod post;
pub mod store;

pub use error::{Error, ErrorKind, Result};
