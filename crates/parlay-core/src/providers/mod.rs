//! Provider capability layer
//!
//! Providers implement the [`Provider`] trait and are registered in a
//! [`ProviderGateway`] under a fixed set of tags. Lookup fails closed:
//! a tag with no registration is an error, never a fall-through.

pub mod azure;
pub mod google;
pub mod stub;
pub mod types;

pub use stub::StubProvider;
pub use types::{Provider, Reply};

use std::collections::HashMap;
use std::sync::Arc;

/// The fixed set of routable provider tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Google,
    Azure,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Google => write!(f, "google"),
            Self::Azure => write!(f, "azure"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Self::Google),
            "azure" => Ok(Self::Azure),
            _ => Err(()),
        }
    }
}

/// Registry mapping provider tags to capabilities.
///
/// Clients are process-wide and long-lived; the registry is read-only
/// once built, so no locking is needed across requests.
#[derive(Default)]
pub struct ProviderGateway {
    providers: HashMap<ProviderKind, Arc<dyn Provider>>,
}

impl ProviderGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability under a tag, replacing any previous one.
    pub fn register(&mut self, kind: ProviderKind, provider: Arc<dyn Provider>) {
        self.providers.insert(kind, provider);
    }

    /// Look up a capability. `None` means the tag is not registered and
    /// the request must fail closed.
    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn Provider>> {
        self.providers.get(&kind).map(Arc::clone)
    }

    /// Registered tags, for diagnostics.
    pub fn kinds(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<_> = self.providers.keys().copied().collect();
        kinds.sort_by_key(|k| k.to_string());
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    struct EchoProvider;

    #[async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }
        async fn generate(&self, prompt: &str) -> Result<Reply> {
            Ok(Reply::text(format!("echo: {prompt}")))
        }
    }

    #[test]
    fn test_kind_parse_and_display() {
        assert_eq!("google".parse::<ProviderKind>(), Ok(ProviderKind::Google));
        assert_eq!("azure".parse::<ProviderKind>(), Ok(ProviderKind::Azure));
        assert!("bogus".parse::<ProviderKind>().is_err());
        assert!("GOOGLE".parse::<ProviderKind>().is_err());
        assert_eq!(ProviderKind::Google.to_string(), "google");
    }

    #[test]
    fn test_registry_fails_closed() {
        let mut gateway = ProviderGateway::new();
        gateway.register(ProviderKind::Google, Arc::new(EchoProvider));
        assert!(gateway.get(ProviderKind::Google).is_some());
        assert!(gateway.get(ProviderKind::Azure).is_none());
    }

    #[tokio::test]
    async fn test_registered_provider_generates() {
        let mut gateway = ProviderGateway::new();
        gateway.register(ProviderKind::Azure, Arc::new(EchoProvider));
        let provider = gateway.get(ProviderKind::Azure).unwrap();
        let reply = provider.generate("hi").await.unwrap();
        assert_eq!(reply.text, "echo: hi");
        assert!(!reply.degraded);
    }

    #[test]
    fn test_kinds_sorted() {
        let mut gateway = ProviderGateway::new();
        gateway.register(ProviderKind::Google, Arc::new(EchoProvider));
        gateway.register(ProviderKind::Azure, Arc::new(EchoProvider));
        assert_eq!(gateway.kinds(), vec![ProviderKind::Azure, ProviderKind::Google]);
    }
}
