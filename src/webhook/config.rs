//! Webhook token authenticator configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// TokenReview webhook configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// TokenReview endpoint URL.
    /// Example: "https://webhook.example.com/authenticate"
    #[serde(default)]
    pub url: String,

    /// CA bundle (PEM) used to verify the webhook's serving certificate.
    #[serde(default)]
    pub ca_bundle_path: Option<PathBuf>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// apiVersion sent in TokenReview objects.
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

fn default_timeout() -> u64 {
    10
}

fn default_api_version() -> String {
    "authentication.k8s.io/v1".to_string()
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            ca_bundle_path: None,
            timeout_secs: default_timeout(),
            api_version: default_api_version(),
        }
    }
}

impl WebhookConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("Webhook authenticator requires url".to_string());
        }

        if !self.url.starts_with("https://") && !self.url.starts_with("http://") {
            return Err(format!("Webhook url must be http(s): {}", self.url));
        }

        if self.url.starts_with("http://") {
            tracing::warn!(url = %self.url, "Webhook url is not using TLS, tokens are sent in cleartext");
        }

        if let Some(ref path) = self.ca_bundle_path {
            if !path.exists() {
                return Err(format!("Webhook CA bundle does not exist: {:?}", path));
            }
        }

        if self.timeout_secs == 0 {
            return Err("Webhook timeout_secs must be greater than zero".to_string());
        }

        Ok(())
    }
}

/// JSON configuration for the webhook section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct WebhookConfigJson {
    pub url: Option<String>,
    pub ca_bundle_path: Option<String>,
    pub timeout_secs: Option<u64>,
    pub api_version: Option<String>,
}

impl WebhookConfigJson {
    /// Apply JSON config to existing config.
    pub fn apply_to(&self, config: &mut WebhookConfig) {
        if let Some(ref url) = self.url {
            config.url = url.clone();
        }
        if let Some(ref path) = self.ca_bundle_path {
            config.ca_bundle_path = Some(PathBuf::from(path));
        }
        if let Some(timeout) = self.timeout_secs {
            config.timeout_secs = timeout;
        }
        if let Some(ref version) = self.api_version {
            config.api_version = version.clone();
        }
    }
}
