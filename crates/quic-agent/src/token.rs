//! Resolves a bearer token to the caller identity attributed on audit
//! records (spec §6). The real token store lives outside this process —
//! minted and rotated by an external collaborator — so this is a thin
//! seam an operator points at whatever that store turns out to be.

use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait TokenResolver: Send + Sync {
    /// Resolves a bearer token to a caller identity, or `None` if the
    /// token is unknown or expired.
    async fn resolve(&self, token: &str) -> Option<String>;
}

/// Resolves tokens from a fixed map loaded at startup from the agent's
/// config file. Adequate for a single-operator deployment; a multi-tenant
/// deployment would swap this for an adapter backed by the real store.
pub struct StaticTokenResolver {
    tokens: HashMap<String, String>,
}

impl StaticTokenResolver {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl TokenResolver for StaticTokenResolver {
    async fn resolve(&self, token: &str) -> Option<String> {
        self.tokens.get(token).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_known_token() {
        let mut tokens = HashMap::new();
        tokens.insert("secret-abc".to_string(), "alice".to_string());
        let resolver = StaticTokenResolver::new(tokens);

        assert_eq!(resolver.resolve("secret-abc").await, Some("alice".to_string()));
        assert_eq!(resolver.resolve("unknown").await, None);
    }
}
