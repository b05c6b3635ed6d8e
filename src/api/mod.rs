//! HTTP surface for token credential requests.

pub mod admission;
pub mod config;
pub mod error;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::credential::{CredentialRequestHandler, ValidateObject};

pub use admission::NamespaceAllowlist;
pub use config::{ServerConfig, ServerConfigJson};

/// Route for creating token credential requests.
pub const TOKEN_CREDENTIAL_REQUESTS_PATH: &str =
    "/apis/login.concierge.pinniped.dev/v1alpha1/namespaces/{namespace}/tokencredentialrequests";

/// Shared application state.
pub struct AppState {
    pub handler: CredentialRequestHandler,
    /// Admission check applied to every create.
    pub admission: Option<Arc<dyn ValidateObject>>,
    /// PEM bundle served at `/ca.crt`.
    pub ca_bundle: Option<String>,
    /// Cancelled when the server shuts down; each request gets a child token.
    pub shutdown: CancellationToken,
    pub request_timeout: Option<Duration>,
}

/// Build the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/ca.crt", get(handlers::ca_bundle))
        .route(
            TOKEN_CREDENTIAL_REQUESTS_PATH,
            post(handlers::create_token_credential_request),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
