//! Webhook token authentication.
//!
//! Verifies bearer tokens by submitting a Kubernetes `TokenReview` to a
//! remote webhook and mapping the reviewed user to an identity.

pub mod authenticator;
pub mod config;

pub use authenticator::WebhookAuthenticator;
pub use config::{WebhookConfig, WebhookConfigJson};
