//! Rendering of protocol errors as Kubernetes `Status` objects.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::credential::{RequestError, KIND};

/// Kubernetes `Status` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub api_version: &'static str,
    pub kind: &'static str,
    pub status: &'static str,
    pub message: String,
    pub reason: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<StatusDetails>,
    pub code: u16,
}

#[derive(Debug, Serialize)]
pub struct StatusDetails {
    pub name: String,
    pub kind: String,
    pub causes: Vec<StatusCause>,
}

#[derive(Debug, Serialize)]
pub struct StatusCause {
    pub reason: &'static str,
    pub message: String,
    pub field: String,
}

fn status_code(err: &RequestError) -> StatusCode {
    match err {
        RequestError::BadRequest(_) => StatusCode::BAD_REQUEST,
        RequestError::Invalid { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        RequestError::Forbidden(_) => StatusCode::FORBIDDEN,
        RequestError::Canceled => StatusCode::SERVICE_UNAVAILABLE,
        RequestError::Timeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl From<&RequestError> for Status {
    fn from(err: &RequestError) -> Self {
        let details = match err {
            RequestError::Invalid { kind, name, .. } => Some(StatusDetails {
                name: name.clone(),
                kind: kind.clone(),
                causes: err
                    .field_errors()
                    .iter()
                    .map(|e| StatusCause {
                        reason: e.kind.reason(),
                        message: format!("{}: {}", e.kind, e.detail),
                        field: e.field.clone(),
                    })
                    .collect(),
            }),
            RequestError::Forbidden(_) => Some(StatusDetails {
                name: String::new(),
                kind: KIND.to_lowercase() + "s",
                causes: vec![],
            }),
            _ => None,
        };

        Status {
            api_version: "v1",
            kind: "Status",
            status: "Failure",
            message: err.to_string(),
            reason: err.reason(),
            details,
            code: status_code(err).as_u16(),
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = Status::from(&self);
        (status_code(&self), Json(status)).into_response()
    }
}
