//! HTTP server configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Namespaces in which requests are admitted. Empty admits all.
    #[serde(default)]
    pub allowed_namespaces: Vec<String>,

    /// Deadline applied to each exchange, in seconds.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// Upper bound on the per-request deadline.
const MAX_REQUEST_TIMEOUT_SECS: u64 = 60 * 60;

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            allowed_namespaces: vec![],
            request_timeout_secs: None,
        }
    }
}

impl ServerConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.listen
            .parse::<SocketAddr>()
            .map_err(|e| format!("Invalid listen address {:?}: {}", self.listen, e))?;

        match self.request_timeout_secs {
            Some(0) => return Err("request_timeout_secs must be greater than zero".to_string()),
            Some(secs) if secs > MAX_REQUEST_TIMEOUT_SECS => {
                return Err(format!(
                    "request_timeout_secs must be at most {}",
                    MAX_REQUEST_TIMEOUT_SECS
                ))
            }
            _ => {}
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// JSON configuration for the server section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfigJson {
    pub listen: Option<String>,
    pub allowed_namespaces: Option<Vec<String>>,
    pub request_timeout_secs: Option<u64>,
}

impl ServerConfigJson {
    /// Apply JSON config to existing config.
    pub fn apply_to(&self, config: &mut ServerConfig) {
        if let Some(ref listen) = self.listen {
            config.listen = listen.clone();
        }
        if let Some(ref namespaces) = self.allowed_namespaces {
            config.allowed_namespaces = namespaces.clone();
        }
        if let Some(timeout) = self.request_timeout_secs {
            config.request_timeout_secs = Some(timeout);
        }
    }
}
