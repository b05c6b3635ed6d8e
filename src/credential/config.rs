//! Credential exchange configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifetime of client certificates handed out by the exchange.
pub const CLIENT_CERTIFICATE_TTL: Duration = Duration::from_secs(60 * 60);

/// Upper bound on a configured client certificate lifetime.
pub const MAX_CLIENT_CERTIFICATE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Credential exchange configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExchangeConfig {
    /// Lifetime of issued client certificates in seconds.
    #[serde(default = "default_ttl")]
    pub client_certificate_ttl_secs: u64,
}

fn default_ttl() -> u64 {
    CLIENT_CERTIFICATE_TTL.as_secs()
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            client_certificate_ttl_secs: default_ttl(),
        }
    }
}

impl ExchangeConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.client_certificate_ttl_secs == 0 {
            return Err("client_certificate_ttl_secs must be greater than zero".to_string());
        }
        if self.client_certificate_ttl_secs > MAX_CLIENT_CERTIFICATE_TTL.as_secs() {
            return Err(format!(
                "client_certificate_ttl_secs must be at most {}",
                MAX_CLIENT_CERTIFICATE_TTL.as_secs()
            ));
        }
        Ok(())
    }

    pub fn client_certificate_ttl(&self) -> Duration {
        Duration::from_secs(self.client_certificate_ttl_secs)
    }
}

/// JSON configuration for the exchange section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ExchangeConfigJson {
    pub client_certificate_ttl_secs: Option<u64>,
}

impl ExchangeConfigJson {
    /// Apply JSON config to existing config.
    pub fn apply_to(&self, config: &mut ExchangeConfig) {
        if let Some(ttl) = self.client_certificate_ttl_secs {
            config.client_certificate_ttl_secs = ttl;
        }
    }
}
