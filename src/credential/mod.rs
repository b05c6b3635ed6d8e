//! Token credential requests.
//!
//! Exchange a bearer token for a short-lived client certificate:
//! - Structural validation of the request
//! - Token authentication through a pluggable authenticator
//! - Certificate issuance through a pluggable issuer
//!
//! Authentication and issuance failures are reported in-band as an opaque
//! "authentication failed" status, never as errors.

pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod types;

pub use config::{ExchangeConfig, ExchangeConfigJson};
pub use context::RequestContext;
pub use error::RequestError;
pub use handler::{
    CertIssuer, CredentialRequestHandler, IssuedPem, Subject, TokenCredentialRequestAuthenticator,
    UserInfo, ValidateObject,
};
pub use types::{CreateOptions, TokenCredentialRequest, KIND, TOKEN_CREDENTIAL_TYPE};
