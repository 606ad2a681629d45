//! Namespace secret resolution for a running flow.
//!
//! Concrete credential storage is out of scope; the worker pool only needs
//! this thin lookup, and falls back to an empty map (logging the error)
//! when resolution fails.

use async_trait::async_trait;
use flowforge_core::NamespaceId;
use std::collections::HashMap;

/// Resolves the secret set a flow's actions may reference via
/// `secrets.<name>` in interpolation expressions.
#[async_trait]
pub trait SecretsProvider: Send + Sync {
    /// Looks up secrets scoped to `(flow_slug, namespace_id)`.
    async fn get_secrets(
        &self,
        flow_slug: &str,
        namespace_id: NamespaceId,
    ) -> Result<HashMap<String, String>, String>;
}

/// A provider with no secrets, used when no external secret store is wired
/// up and for tests.
pub struct NoopSecretsProvider;

#[async_trait]
impl SecretsProvider for NoopSecretsProvider {
    async fn get_secrets(
        &self,
        _flow_slug: &str,
        _namespace_id: NamespaceId,
    ) -> Result<HashMap<String, String>, String> {
        Ok(HashMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_provider_returns_empty_map() {
        let provider = NoopSecretsProvider;
        let secrets = provider.get_secrets("f", NamespaceId::new()).await.unwrap();
        assert!(secrets.is_empty());
    }
}
