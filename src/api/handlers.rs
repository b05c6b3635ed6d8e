//! HTTP request handlers.

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::AppState;
use crate::credential::{CreateOptions, RequestContext, RequestError, TokenCredentialRequest};

/// Query parameters accepted on create.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuery {
    pub dry_run: Option<String>,
}

impl From<CreateQuery> for CreateOptions {
    fn from(query: CreateQuery) -> Self {
        CreateOptions {
            dry_run: query.dry_run.into_iter().filter(|v| !v.is_empty()).collect(),
        }
    }
}

/// Liveness check.
pub async fn healthz() -> &'static str {
    "ok"
}

/// Serve the CA bundle that signs issued client certificates.
pub async fn ca_bundle(State(state): State<Arc<AppState>>) -> Response {
    match &state.ca_bundle {
        Some(bundle) => (
            [(header::CONTENT_TYPE, "application/x-pem-file")],
            bundle.clone(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Create a token credential request.
pub async fn create_token_credential_request(
    State(state): State<Arc<AppState>>,
    Path(namespace): Path<String>,
    query: Result<Query<CreateQuery>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<TokenCredentialRequest>), RequestError> {
    let Query(query) = query.map_err(|e| RequestError::BadRequest(e.body_text()))?;
    let body =
        body.map_err(|_| RequestError::BadRequest("failed to read request body".to_string()))?;
    let mut obj: Value = serde_json::from_slice(&body)
        .map_err(|_| RequestError::BadRequest("request body is not valid JSON".to_string()))?;
    set_namespace(&mut obj, &namespace)?;

    let mut ctx = RequestContext::new(state.shutdown.child_token());
    if let Some(timeout) = state.request_timeout {
        ctx = ctx.with_timeout(timeout);
    }

    debug!(namespace = %namespace, "Handling token credential request");

    let options = CreateOptions::from(query);
    let response = state
        .handler
        .create(
            &ctx,
            obj,
            state.admission.as_deref(),
            Some(&options),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Fill in the namespace from the path, refusing a conflicting one.
fn set_namespace(obj: &mut Value, namespace: &str) -> Result<(), RequestError> {
    let root = obj
        .as_object_mut()
        .ok_or_else(|| RequestError::BadRequest("request body must be a JSON object".to_string()))?;

    let metadata = root
        .entry("metadata")
        .or_insert_with(|| Value::Object(Default::default()));
    if metadata.is_null() {
        *metadata = Value::Object(Default::default());
    }
    let metadata = metadata
        .as_object_mut()
        .ok_or_else(|| RequestError::BadRequest("metadata must be an object".to_string()))?;

    match metadata.get("namespace").and_then(|ns| ns.as_str()) {
        Some(existing) if !existing.is_empty() && existing != namespace => {
            Err(RequestError::BadRequest(
                "the namespace of the provided object does not match the namespace sent on the request"
                    .to_string(),
            ))
        }
        _ => {
            metadata.insert("namespace".to_string(), Value::String(namespace.to_string()));
            Ok(())
        }
    }
}
