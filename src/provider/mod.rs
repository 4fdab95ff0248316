/// CA provider dispatch
///
/// A provider maps a server URI (`acme://<host>[/<variant>]` or a plain
/// `http(s)` directory URL) to a directory URL and carries per-CA quirks:
/// directory metadata patching, EAB MAC algorithm proposals, pinned trust
/// anchors.
pub mod generic;
pub mod letsencrypt;
pub mod pebble;
#[cfg(feature = "zerossl-ca")]
pub mod zerossl;

use crate::error::{AcmeError, Result};
use crate::transport::{HttpTransport, TransportSettings};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

pub use generic::GenericProvider;
pub use letsencrypt::LetsEncryptProvider;
pub use pebble::PebbleProvider;
#[cfg(feature = "zerossl-ca")]
pub use zerossl::ZeroSslProvider;

/// A certificate authority known to the client
#[async_trait]
pub trait AcmeProvider: Send + Sync {
    /// Short name for diagnostics
    fn name(&self) -> &'static str;

    /// Whether this provider handles the given server URI
    fn accepts(&self, uri: &Url) -> bool;

    /// Resolve the server URI to a directory URL
    fn resolve(&self, uri: &Url) -> Result<String>;

    /// Fetch the directory document
    ///
    /// Providers override this to patch nonconforming metadata before it is
    /// interpreted; the default performs a plain GET.
    async fn directory(&self, transport: &HttpTransport, directory_url: &str) -> Result<Value> {
        let response = transport.get(directory_url).await?;
        if !response.is_success() {
            return Err(AcmeError::protocol(format!(
                "Failed to fetch directory: HTTP {}",
                response.status
            )));
        }
        response.json()
    }

    /// EAB MAC algorithm this CA expects, when it deviates from HS256
    fn eab_mac_algorithm(&self) -> Option<&'static str> {
        None
    }

    /// Custom transport for this CA (e.g. pinned trust anchors)
    fn transport(&self, _settings: &TransportSettings) -> Result<Option<HttpTransport>> {
        Ok(None)
    }
}

/// Registry of known providers
///
/// Exactly one provider must accept a given server URI; zero or several
/// acceptors fail session construction.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn AcmeProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in providers
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GenericProvider));
        registry.register(Arc::new(LetsEncryptProvider));
        #[cfg(feature = "zerossl-ca")]
        registry.register(Arc::new(ZeroSslProvider));
        registry
    }

    /// Add a provider
    pub fn register(&mut self, provider: Arc<dyn AcmeProvider>) {
        self.providers.push(provider);
    }

    /// Find the single provider accepting the given server URI
    pub fn find(&self, server_uri: &str) -> Result<Arc<dyn AcmeProvider>> {
        let uri = Url::parse(server_uri)
            .map_err(|e| AcmeError::configuration(format!("Invalid server URI: {}", e)))?;

        let mut accepting: Vec<&Arc<dyn AcmeProvider>> =
            self.providers.iter().filter(|p| p.accepts(&uri)).collect();

        match accepting.len() {
            1 => Ok(Arc::clone(accepting.remove(0))),
            0 => Err(AcmeError::configuration(format!(
                "No provider accepts {}",
                server_uri
            ))),
            _ => Err(AcmeError::configuration(format!(
                "Multiple providers accept {}: {}",
                server_uri,
                accepting
                    .iter()
                    .map(|p| p.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }
}
