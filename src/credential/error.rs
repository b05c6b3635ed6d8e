//! Protocol errors returned for caller misuse.

use std::fmt;
use thiserror::Error;

/// Reason a single field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    Required,
    NotSupported,
}

impl FieldErrorKind {
    /// Machine-readable cause reason, as used in Kubernetes `Status` objects.
    pub fn reason(&self) -> &'static str {
        match self {
            FieldErrorKind::Required => "FieldValueRequired",
            FieldErrorKind::NotSupported => "FieldValueNotSupported",
        }
    }
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldErrorKind::Required => write!(f, "Required value"),
            FieldErrorKind::NotSupported => write!(f, "Unsupported value"),
        }
    }
}

/// Validation error for one field of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted field path, e.g. `spec.token.value`.
    pub field: String,
    pub kind: FieldErrorKind,
    pub detail: String,
}

impl FieldError {
    pub fn required(field: &str, detail: &str) -> Self {
        Self {
            field: field.to_string(),
            kind: FieldErrorKind::Required,
            detail: detail.to_string(),
        }
    }

    pub fn not_supported(field: &str, value: &[String]) -> Self {
        Self {
            field: field.to_string(),
            kind: FieldErrorKind::NotSupported,
            detail: format!("{:?}", value),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.field, self.kind, self.detail)
    }
}

/// Errors surfaced to the caller of an exchange.
///
/// Only protocol misuse and system conditions end up here. Authentication and
/// issuance failures are returned in-band instead.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{kind} \"{name}\" is invalid: {}", join_field_errors(.errors))]
    Invalid {
        kind: String,
        name: String,
        errors: Vec<FieldError>,
    },

    #[error("{0}")]
    Forbidden(String),

    #[error("request was canceled")]
    Canceled,

    #[error("request deadline exceeded")]
    Timeout,
}

impl RequestError {
    pub fn invalid(kind: &str, name: &str, errors: Vec<FieldError>) -> Self {
        RequestError::Invalid {
            kind: kind.to_string(),
            name: name.to_string(),
            errors,
        }
    }

    /// Machine-readable reason, as used in Kubernetes `Status` objects.
    pub fn reason(&self) -> &'static str {
        match self {
            RequestError::BadRequest(_) => "BadRequest",
            RequestError::Invalid { .. } => "Invalid",
            RequestError::Forbidden(_) => "Forbidden",
            RequestError::Canceled => "ServiceUnavailable",
            RequestError::Timeout => "Timeout",
        }
    }

    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            RequestError::Invalid { errors, .. } => errors,
            _ => &[],
        }
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    let parts: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    if parts.len() == 1 {
        parts.join("")
    } else {
        format!("[{}]", parts.join(", "))
    }
}
