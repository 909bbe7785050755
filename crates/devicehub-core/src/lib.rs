//! devicehub core: domain records, validation, store contracts, and services.
//!
//! This crate holds the device registry and metrics analytics logic. It carries
//! no HTTP or SQL dependencies; the server crate supplies store implementations
//! and the transport.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `DeviceHubError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod cache;
pub mod clock;
pub mod error;
pub mod model;
pub mod service;
pub mod store;
pub mod validate;

/// Shared result type.
pub use error::{DeviceHubError, Result};
