//! devicehub server library entry.
//!
//! This crate wires config, storage, the core services, and the HTTP API
//! into a runnable server. It is consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod api;
pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod router;
pub mod store;
