//! Credential exchange agent.
//!
//! Exchanges bearer tokens for short-lived X.509 client certificates.
//! Tokens are verified by a TokenReview webhook and certificates are signed
//! by a local CA.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod api;
mod credential;
mod issuer;
mod webhook;

use api::{AppState, NamespaceAllowlist, ServerConfig, ServerConfigJson};
use credential::{CredentialRequestHandler, ExchangeConfig, ExchangeConfigJson, ValidateObject};
use issuer::{CaIssuer, IssuerConfig, IssuerConfigJson};
use webhook::{WebhookAuthenticator, WebhookConfig, WebhookConfigJson};

/// Command line arguments
#[derive(Parser, Debug, Default)]
#[command(name = "zentinel-credential-agent")]
#[command(about = "Credential exchange agent - bearer tokens for short-lived client certificates")]
struct Args {
    /// JSON configuration file
    #[arg(long, env = "CREDENTIAL_AGENT_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(long, env = "CREDENTIAL_AGENT_LISTEN")]
    listen: Option<String>,

    /// TokenReview webhook URL
    #[arg(long, env = "TOKEN_WEBHOOK_URL")]
    webhook_url: Option<String>,

    /// CA bundle used to verify the webhook server
    #[arg(long, env = "TOKEN_WEBHOOK_CA_BUNDLE")]
    webhook_ca_bundle: Option<PathBuf>,

    /// CA certificate used to sign client certificates
    #[arg(long, env = "ISSUER_CA_CERT")]
    ca_cert: Option<PathBuf>,

    /// CA private key used to sign client certificates
    #[arg(long, env = "ISSUER_CA_KEY")]
    ca_key: Option<PathBuf>,

    /// Lifetime of issued client certificates in seconds
    #[arg(long, env = "CLIENT_CERTIFICATE_TTL_SECS")]
    certificate_ttl_secs: Option<u64>,

    /// Namespaces in which requests are admitted (comma-separated)
    #[arg(long, env = "ALLOWED_NAMESPACES", value_delimiter = ',')]
    allowed_namespaces: Vec<String>,

    /// Deadline for each exchange in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, env = "CREDENTIAL_AGENT_VERBOSE")]
    verbose: bool,
}

/// Agent configuration
#[derive(Debug, Clone, Default)]
struct AgentConfig {
    webhook: WebhookConfig,
    issuer: IssuerConfig,
    exchange: ExchangeConfig,
    server: ServerConfig,
}

/// JSON configuration file layout
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct AgentConfigJson {
    /// TokenReview webhook configuration
    #[serde(default)]
    webhook: WebhookConfigJson,
    /// Certificate authority configuration
    #[serde(default)]
    issuer: IssuerConfigJson,
    /// Exchange configuration
    #[serde(default)]
    exchange: ExchangeConfigJson,
    /// HTTP server configuration
    #[serde(default)]
    server: ServerConfigJson,
}

impl AgentConfigJson {
    fn apply_to(&self, config: &mut AgentConfig) {
        self.webhook.apply_to(&mut config.webhook);
        self.issuer.apply_to(&mut config.issuer);
        self.exchange.apply_to(&mut config.exchange);
        self.server.apply_to(&mut config.server);
    }
}

impl AgentConfig {
    /// Build configuration from defaults, the config file, then flags.
    fn from_args(args: &Args) -> Result<Self> {
        let mut config = AgentConfig::default();

        if let Some(path) = &args.config {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            let json: AgentConfigJson = serde_json::from_str(&data)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            json.apply_to(&mut config);
        }

        if let Some(listen) = &args.listen {
            config.server.listen = listen.clone();
        }
        if let Some(url) = &args.webhook_url {
            config.webhook.url = url.clone();
        }
        if let Some(path) = &args.webhook_ca_bundle {
            config.webhook.ca_bundle_path = Some(path.clone());
        }
        if let Some(path) = &args.ca_cert {
            config.issuer.ca_cert_path = Some(path.clone());
        }
        if let Some(path) = &args.ca_key {
            config.issuer.ca_key_path = Some(path.clone());
        }
        if let Some(ttl) = args.certificate_ttl_secs {
            config.exchange.client_certificate_ttl_secs = ttl;
        }
        if !args.allowed_namespaces.is_empty() {
            config.server.allowed_namespaces = args.allowed_namespaces.clone();
        }
        if let Some(timeout) = args.request_timeout_secs {
            config.server.request_timeout_secs = Some(timeout);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.webhook
            .validate()
            .map_err(|e| anyhow!("Invalid webhook config: {}", e))?;
        self.issuer
            .validate()
            .map_err(|e| anyhow!("Invalid issuer config: {}", e))?;
        self.exchange
            .validate()
            .map_err(|e| anyhow!("Invalid exchange config: {}", e))?;
        self.server
            .validate()
            .map_err(|e| anyhow!("Invalid server config: {}", e))?;
        Ok(())
    }
}

/// Wire collaborators into shared application state.
fn build_state(config: &AgentConfig, shutdown: CancellationToken) -> Result<AppState> {
    let authenticator = WebhookAuthenticator::new(&config.webhook)?;
    let issuer = CaIssuer::from_config(&config.issuer)?;
    let ca_bundle = issuer.ca_bundle_pem().to_string();

    let handler = CredentialRequestHandler::new(Arc::new(authenticator), Arc::new(issuer))
        .with_certificate_ttl(config.exchange.client_certificate_ttl());

    let admission = NamespaceAllowlist::new(config.server.allowed_namespaces.clone())
        .map(|allowlist| Arc::new(allowlist) as Arc<dyn ValidateObject>);

    Ok(AppState {
        handler,
        admission,
        ca_bundle: Some(ca_bundle),
        shutdown,
        request_timeout: config.server.request_timeout(),
    })
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "{}={},tower_http=info",
            env!("CARGO_CRATE_NAME"),
            log_level
        ))
        .json()
        .init();

    info!("Starting Zentinel Credential Agent");

    let config = AgentConfig::from_args(&args)?;

    info!(
        webhook_url = %config.webhook.url,
        ca_from_files = config.issuer.uses_files(),
        certificate_ttl_secs = config.exchange.client_certificate_ttl_secs,
        allowed_namespaces = config.server.allowed_namespaces.len(),
        "Configuration loaded"
    );

    let shutdown = CancellationToken::new();
    let state = build_state(&config, shutdown.clone())?;
    let app = api::create_router(Arc::new(state));

    let addr: SocketAddr = config
        .server
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.server.listen))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(listen = %addr, "Starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}
