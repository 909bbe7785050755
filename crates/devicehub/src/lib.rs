//! Top-level facade crate for devicehub.
//!
//! Re-exports the domain crate and the server library so users can depend on a single crate.

pub mod core {
    pub use devicehub_core::*;
}

pub mod server {
    pub use devicehub_server::*;
}
