//! Token credential request object model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API group/version served by the exchange.
pub const API_VERSION: &str = "login.concierge.pinniped.dev/v1alpha1";

/// Object kind of exchange requests.
pub const KIND: &str = "TokenCredentialRequest";

/// The only credential type the exchange understands.
pub const TOKEN_CREDENTIAL_TYPE: &str = "token";

/// Message carried by every failed exchange, whatever the cause.
pub const AUTHENTICATION_FAILED_MESSAGE: &str = "authentication failed";

/// Object metadata (subset used by the exchange).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Bearer token being exchanged.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCredential {
    #[serde(default)]
    pub value: String,
}

// Keep the token out of logs and panic messages.
impl fmt::Debug for TokenCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = if self.value.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("TokenCredential").field("value", &value).finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCredentialRequestSpec {
    /// Kind of secret being exchanged; only "token" is understood.
    #[serde(rename = "type", default)]
    pub credential_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenCredential>,
}

/// Credential handed back on a successful exchange.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCredential {
    pub expiration_timestamp: DateTime<Utc>,
    pub client_certificate_data: String,
    pub client_key_data: String,
}

impl fmt::Debug for ClusterCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterCredential")
            .field("expiration_timestamp", &self.expiration_timestamp)
            .field("client_certificate_data", &self.client_certificate_data)
            .field("client_key_data", &"<redacted>")
            .finish()
    }
}

/// Result of an exchange as seen by the caller.
///
/// Every failure in the authentication path collapses into
/// `AuthenticationFailed`; the cause is only visible in traces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Issued(ClusterCredential),
    AuthenticationFailed,
}

/// Status of an exchange. Built only from an [`ExchangeOutcome`], so exactly
/// one of `credential` and `message` is ever set on a response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCredentialRequestStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<ClusterCredential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<ExchangeOutcome> for TokenCredentialRequestStatus {
    fn from(outcome: ExchangeOutcome) -> Self {
        match outcome {
            ExchangeOutcome::Issued(credential) => Self {
                credential: Some(credential),
                message: None,
            },
            ExchangeOutcome::AuthenticationFailed => Self {
                credential: None,
                message: Some(AUTHENTICATION_FAILED_MESSAGE.to_string()),
            },
        }
    }
}

/// Request to exchange a token for a client certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCredentialRequest {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: TokenCredentialRequestSpec,
    #[serde(default)]
    pub status: TokenCredentialRequestStatus,
}

impl Default for TokenCredentialRequest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ObjectMeta::default(),
            spec: TokenCredentialRequestSpec::default(),
            status: TokenCredentialRequestStatus::default(),
        }
    }
}

impl TokenCredentialRequest {
    /// Build a token-type request.
    #[cfg(test)]
    pub fn with_token(token: &str) -> Self {
        Self {
            spec: TokenCredentialRequestSpec {
                credential_type: TOKEN_CREDENTIAL_TYPE.to_string(),
                token: Some(TokenCredential {
                    value: token.to_string(),
                }),
            },
            ..Default::default()
        }
    }

    /// The token to exchange, or "" when none was supplied.
    pub fn token(&self) -> &str {
        self.spec
            .token
            .as_ref()
            .map(|t| t.value.as_str())
            .unwrap_or("")
    }

    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or("")
    }

    /// Copy of this request with the token cleared.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Some(token) = copy.spec.token.as_mut() {
            token.value.clear();
        }
        copy
    }

    /// Response object carrying the outcome of an exchange.
    pub fn response(outcome: ExchangeOutcome) -> Self {
        Self {
            status: outcome.into(),
            ..Default::default()
        }
    }
}

/// Options supplied alongside a create call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOptions {
    /// Dry-run directives. Any value is rejected.
    pub dry_run: Vec<String>,
}
