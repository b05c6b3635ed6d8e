//! Admission checks run before authentication.

use crate::credential::{RequestError, TokenCredentialRequest, ValidateObject};

/// Admits requests only from a fixed set of namespaces.
#[derive(Debug, Clone)]
pub struct NamespaceAllowlist {
    namespaces: Vec<String>,
}

impl NamespaceAllowlist {
    /// Returns `None` when the list is empty, meaning every namespace is admitted.
    pub fn new(namespaces: Vec<String>) -> Option<Self> {
        if namespaces.is_empty() {
            return None;
        }
        Some(Self { namespaces })
    }
}

impl ValidateObject for NamespaceAllowlist {
    fn validate(&self, request: &TokenCredentialRequest) -> Result<(), RequestError> {
        let namespace = request.metadata.namespace.as_deref().unwrap_or("");
        if self.namespaces.iter().any(|allowed| allowed == namespace) {
            return Ok(());
        }
        Err(RequestError::Forbidden(format!(
            "tokencredentialrequests are not allowed in namespace {:?}",
            namespace
        )))
    }
}
