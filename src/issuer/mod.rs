//! Client certificate issuance.
//!
//! Signs short-lived X.509 client certificates with a CA that is either
//! loaded from disk or generated at startup.

pub mod ca;
pub mod config;

pub use ca::CaIssuer;
pub use config::{IssuerConfig, IssuerConfigJson};
