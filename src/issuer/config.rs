//! Certificate issuer configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Client certificate CA configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssuerConfig {
    /// CA certificate (PEM). When unset an ephemeral CA is generated.
    #[serde(default)]
    pub ca_cert_path: Option<PathBuf>,

    /// CA private key (PEM, PKCS#8).
    #[serde(default)]
    pub ca_key_path: Option<PathBuf>,

    /// Common name of a generated CA.
    #[serde(default = "default_ca_common_name")]
    pub ca_common_name: String,

    /// Lifetime of a generated CA in seconds.
    #[serde(default = "default_ca_ttl")]
    pub ca_ttl_secs: u64,
}

/// Upper bound on the lifetime of a generated CA: ten years.
const MAX_CA_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

fn default_ca_common_name() -> String {
    "credential-exchange-ca".to_string()
}

fn default_ca_ttl() -> u64 {
    365 * 24 * 3600 // 1 year
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            ca_cert_path: None,
            ca_key_path: None,
            ca_common_name: default_ca_common_name(),
            ca_ttl_secs: default_ca_ttl(),
        }
    }
}

impl IssuerConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        match (&self.ca_cert_path, &self.ca_key_path) {
            (Some(cert), Some(key)) => {
                if !cert.exists() {
                    return Err(format!("CA certificate file does not exist: {:?}", cert));
                }
                if !key.exists() {
                    return Err(format!("CA key file does not exist: {:?}", key));
                }
            }
            (None, None) => {
                if self.ca_common_name.is_empty() {
                    return Err("ca_common_name must not be empty".to_string());
                }
                if self.ca_ttl_secs == 0 {
                    return Err("ca_ttl_secs must be greater than zero".to_string());
                }
                if self.ca_ttl_secs > MAX_CA_TTL_SECS {
                    return Err(format!("ca_ttl_secs must be at most {}", MAX_CA_TTL_SECS));
                }
            }
            _ => {
                return Err("ca_cert_path and ca_key_path must be set together".to_string());
            }
        }
        Ok(())
    }

    /// Whether CA material is loaded from disk rather than generated.
    pub fn uses_files(&self) -> bool {
        self.ca_cert_path.is_some() && self.ca_key_path.is_some()
    }
}

/// JSON configuration for the issuer section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct IssuerConfigJson {
    pub ca_cert_path: Option<String>,
    pub ca_key_path: Option<String>,
    pub ca_common_name: Option<String>,
    pub ca_ttl_secs: Option<u64>,
}

impl IssuerConfigJson {
    /// Apply JSON config to existing config.
    pub fn apply_to(&self, config: &mut IssuerConfig) {
        if let Some(ref path) = self.ca_cert_path {
            config.ca_cert_path = Some(PathBuf::from(path));
        }
        if let Some(ref path) = self.ca_key_path {
            config.ca_key_path = Some(PathBuf::from(path));
        }
        if let Some(ref cn) = self.ca_common_name {
            config.ca_common_name = cn.clone();
        }
        if let Some(ttl) = self.ca_ttl_secs {
            config.ca_ttl_secs = ttl;
        }
    }
}
