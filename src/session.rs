/// Sessions bind a server URI to a provider; logins add account credentials
use crate::crypto::AccountKey;
use crate::error::{AcmeError, Result};
use crate::protocol::{Directory, Metadata, NoncePool, ResourceKind};
use crate::provider::{AcmeProvider, ProviderRegistry};
use crate::resource::account::Account;
use crate::resource::challenge::ChallengeRegistry;
use crate::transport::{HttpTransport, TransportSettings};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use url::Url;

/// Builder for a session
pub struct SessionBuilder {
    server_uri: String,
    settings: TransportSettings,
    providers: ProviderRegistry,
    challenges: ChallengeRegistry,
}

impl SessionBuilder {
    fn new(server_uri: impl Into<String>) -> Self {
        Self {
            server_uri: server_uri.into(),
            settings: TransportSettings::default(),
            providers: ProviderRegistry::builtin(),
            challenges: ChallengeRegistry::builtin(),
        }
    }

    /// Set transport settings (timeouts, proxy, user agent, language)
    pub fn transport_settings(mut self, settings: TransportSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use a custom provider registry
    pub fn providers(mut self, providers: ProviderRegistry) -> Self {
        self.providers = providers;
        self
    }

    /// Use a custom challenge registry
    pub fn challenges(mut self, challenges: ChallengeRegistry) -> Self {
        self.challenges = challenges;
        self
    }

    /// Resolve the provider and construct the session
    pub fn build(self) -> Result<Arc<Session>> {
        let provider = self.providers.find(&self.server_uri)?;
        let uri = Url::parse(&self.server_uri)
            .map_err(|e| AcmeError::configuration(format!("Invalid server URI: {}", e)))?;
        let directory_url = provider.resolve(&uri)?;

        let transport = match provider.transport(&self.settings)? {
            Some(transport) => transport,
            None => HttpTransport::new(&self.settings)?,
        };

        info!(
            server_uri = %self.server_uri,
            directory_url = %directory_url,
            provider = provider.name(),
            "Session created"
        );

        Ok(Arc::new(Session {
            server_uri: self.server_uri,
            provider,
            directory_url,
            transport,
            directory: RwLock::new(None),
            nonce_pool: NoncePool::new(),
            challenges: Arc::new(self.challenges),
        }))
    }
}

/// A connection context for one ACME server
///
/// Holds the resolved directory URL, the lazily fetched directory document,
/// the single-slot nonce pool and the bound provider. Share one session per
/// server; signed requests from a session serialize on its nonce pool.
pub struct Session {
    server_uri: String,
    provider: Arc<dyn AcmeProvider>,
    directory_url: String,
    transport: HttpTransport,
    directory: RwLock<Option<Directory>>,
    nonce_pool: NoncePool,
    challenges: Arc<ChallengeRegistry>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("server_uri", &self.server_uri)
            .field("directory_url", &self.directory_url)
            .finish()
    }
}

impl Session {
    /// Create a session with the built-in providers and challenge types
    pub fn new(server_uri: impl Into<String>) -> Result<Arc<Self>> {
        Self::builder(server_uri).build()
    }

    /// Start building a session
    pub fn builder(server_uri: impl Into<String>) -> SessionBuilder {
        SessionBuilder::new(server_uri)
    }

    /// The server URI this session was constructed with
    pub fn server_uri(&self) -> &str {
        &self.server_uri
    }

    /// The directory URL resolved by the provider
    pub fn locate(&self) -> &str {
        &self.directory_url
    }

    /// The provider bound to this session
    pub fn provider(&self) -> &dyn AcmeProvider {
        self.provider.as_ref()
    }

    pub(crate) fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    pub(crate) fn nonce_pool(&self) -> &NoncePool {
        &self.nonce_pool
    }

    pub(crate) fn challenges(&self) -> &ChallengeRegistry {
        &self.challenges
    }

    /// The directory document, fetched on first use and cached
    pub async fn directory(&self) -> Result<Directory> {
        {
            let cached = self.directory.read().await;
            if let Some(directory) = cached.as_ref() {
                return Ok(directory.clone());
            }
        }
        self.reload_directory().await
    }

    /// Fetch the directory again, replacing the cache
    pub async fn reload_directory(&self) -> Result<Directory> {
        let value = self
            .provider
            .directory(&self.transport, &self.directory_url)
            .await?;
        let directory: Directory = serde_json::from_value(value)
            .map_err(|e| AcmeError::protocol(format!("Failed to parse directory: {}", e)))?;

        let mut cached = self.directory.write().await;
        *cached = Some(directory.clone());
        Ok(directory)
    }

    /// URL of a directory endpoint
    pub async fn resource_url(&self, kind: ResourceKind) -> Result<String> {
        let directory = self.directory().await?;
        directory
            .url_for(kind)
            .map(|url| url.to_string())
            .ok_or_else(|| AcmeError::feature_not_supported(kind.as_str()))
    }

    /// Directory metadata; empty when the server advertises none
    pub async fn metadata(&self) -> Result<Metadata> {
        Ok(self.directory().await?.meta.unwrap_or_default())
    }
}

/// A session paired with an account URL and its key pair
///
/// Signed requests from a login use the `kid` JWS header; account creation
/// and key change use the embedded `jwk` form instead.
#[derive(Clone)]
pub struct Login {
    session: Arc<Session>,
    account_url: String,
    key: Arc<dyn AccountKey>,
}

impl Login {
    /// Bind an existing account URL and key pair to a session
    pub fn new(
        session: Arc<Session>,
        account_url: impl Into<String>,
        key: Arc<dyn AccountKey>,
    ) -> Self {
        Self {
            session,
            account_url: account_url.into(),
            key,
        }
    }

    /// The session this login belongs to
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// The immutable account URL
    pub fn account_url(&self) -> &str {
        &self.account_url
    }

    /// The current account key
    pub fn key(&self) -> &Arc<dyn AccountKey> {
        &self.key
    }

    /// The account resource behind this login
    pub fn account(&self) -> Account {
        Account::bind(self.clone())
    }

    /// The same login with a different key, after a key rollover
    pub fn with_key(&self, key: Arc<dyn AccountKey>) -> Login {
        Login {
            session: Arc::clone(&self.session),
            account_url: self.account_url.clone(),
            key,
        }
    }
}
