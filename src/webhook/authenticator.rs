//! TokenReview webhook authenticator.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::config::WebhookConfig;
use crate::credential::{
    RequestContext, TokenCredentialRequest, TokenCredentialRequestAuthenticator, UserInfo,
    TOKEN_CREDENTIAL_TYPE,
};

/// TokenReview sent to the webhook. Deliberately not `Debug`: it carries the token.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenReview<'a> {
    api_version: &'a str,
    kind: &'static str,
    spec: TokenReviewSpec<'a>,
}

#[derive(Serialize)]
struct TokenReviewSpec<'a> {
    token: &'a str,
}

/// TokenReview returned by the webhook.
#[derive(Debug, Deserialize)]
pub struct TokenReviewResponse {
    #[serde(default)]
    pub status: TokenReviewStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenReviewStatus {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<TokenReviewUser>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenReviewUser {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl TokenReviewStatus {
    /// Map a review result to a user, `None` when the token was not accepted.
    pub fn into_user(self) -> Option<UserInfo> {
        if !self.authenticated {
            return None;
        }
        self.user.map(|user| UserInfo {
            name: user.username,
            uid: user.uid,
            groups: user.groups,
        })
    }
}

/// Authenticates tokens by posting TokenReviews to a remote webhook.
pub struct WebhookAuthenticator {
    url: String,
    api_version: String,
    http_client: reqwest::Client,
}

impl WebhookAuthenticator {
    /// Create a new webhook authenticator from configuration.
    pub fn new(config: &WebhookConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs));

        if let Some(ref path) = config.ca_bundle_path {
            let pem = std::fs::read(path)
                .with_context(|| format!("Failed to read webhook CA bundle: {:?}", path))?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .context("Failed to parse webhook CA bundle")?;
            builder = builder.add_root_certificate(cert);
        }

        let http_client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            url: config.url.clone(),
            api_version: config.api_version.clone(),
            http_client,
        })
    }

    /// Submit a TokenReview for `token`.
    async fn review(&self, token: &str) -> Result<TokenReviewStatus> {
        let review = TokenReview {
            api_version: &self.api_version,
            kind: "TokenReview",
            spec: TokenReviewSpec { token },
        };

        // reqwest errors carry the URL, never the body.
        let response = self
            .http_client
            .post(&self.url)
            .json(&review)
            .send()
            .await
            .context("TokenReview request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "TokenReview webhook returned status {}",
                response.status()
            ));
        }

        let review: TokenReviewResponse = response
            .json()
            .await
            .context("Failed to parse TokenReview response")?;

        Ok(review.status)
    }
}

#[async_trait]
impl TokenCredentialRequestAuthenticator for WebhookAuthenticator {
    async fn authenticate_token_credential_request(
        &self,
        _ctx: &RequestContext,
        request: &TokenCredentialRequest,
    ) -> Result<Option<UserInfo>> {
        if request.spec.credential_type != TOKEN_CREDENTIAL_TYPE {
            return Err(anyhow!(
                "Unsupported credential type: {:?}",
                request.spec.credential_type
            ));
        }

        let token = request.token();
        if token.is_empty() {
            return Err(anyhow!("No token supplied"));
        }

        let status = self.review(token).await?;

        if let Some(ref error) = status.error {
            debug!(error = %error, authenticated = status.authenticated, "TokenReview reported an error");
        }

        Ok(status.into_user())
    }
}
