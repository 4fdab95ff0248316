/// Per-identifier authorizations and their challenges
use crate::connection::Connection;
use crate::error::{AcmeError, Result};
use crate::protocol::ResourceKind;
use crate::protocol::jws::JwsIdentity;
use crate::resource::challenge::Challenge;
use crate::resource::{PollOptions, Pollable, wait_for};
use crate::session::Login;
use crate::types::{AuthorizationStatus, Identifier};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::info;

/// Cached authorization document
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationData {
    /// The identifier this authorization proves control over
    pub identifier: Identifier,

    /// Authorization status
    pub status: AuthorizationStatus,

    /// Expiration of this authorization
    #[serde(default)]
    pub expires: Option<jiff::Timestamp>,

    /// Raw challenge documents; dispatched through the challenge registry
    #[serde(default)]
    pub challenges: Vec<Value>,

    /// True if this authorization was created for a wildcard name
    #[serde(default)]
    pub wildcard: bool,
}

/// An authorization resource located by its URL
pub struct Authorization {
    login: Login,
    url: String,
    data: Option<AuthorizationData>,
    challenges: Vec<Challenge>,
}

impl std::fmt::Debug for Authorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorization")
            .field("url", &self.url)
            .field("data", &self.data)
            .field("challenge_count", &self.challenges.len())
            .finish()
    }
}

impl Authorization {
    /// Bind an authorization to its URL without fetching it
    pub fn bind(login: Login, url: impl Into<String>) -> Self {
        Self {
            login,
            url: url.into(),
            data: None,
            challenges: Vec::new(),
        }
    }

    /// Pre-authorize an identifier ahead of any order (RFC 8555 §7.4.1)
    ///
    /// Fails with feature-not-supported when the directory has no `newAuthz`.
    pub async fn pre_authorize(login: &Login, identifier: Identifier) -> Result<Authorization> {
        let session = login.session();
        let new_authz_url = session.resource_url(ResourceKind::NewAuthz).await?;

        let response = Connection::new(session)
            .send(
                &new_authz_url,
                Some(&json!({ "identifier": identifier })),
                login.key().as_ref(),
                JwsIdentity::AccountUrl(login.account_url()),
            )
            .await?;

        let url = response.require_location()?;
        let mut authorization = Authorization::bind(login.clone(), url);
        authorization.apply(response.require_json()?.clone())?;
        info!(authorization = authorization.url(), "Authorization created");
        Ok(authorization)
    }

    /// The immutable authorization URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The cached authorization document, if loaded
    pub fn data(&self) -> Option<&AuthorizationData> {
        self.data.as_ref()
    }

    /// The cached status, if loaded
    pub fn status(&self) -> Option<AuthorizationStatus> {
        self.data.as_ref().map(|d| d.status)
    }

    /// True if the cached status is `valid`
    pub fn is_valid(&self) -> bool {
        self.status() == Some(AuthorizationStatus::Valid)
    }

    /// True if the cached status is `pending`
    pub fn is_pending(&self) -> bool {
        self.status() == Some(AuthorizationStatus::Pending)
    }

    /// The identifier under proof, once loaded
    pub fn identifier(&self) -> Option<&Identifier> {
        self.data.as_ref().map(|d| &d.identifier)
    }

    /// True if this authorization covers a wildcard name
    pub fn is_wildcard(&self) -> bool {
        self.data.as_ref().is_some_and(|d| d.wildcard)
    }

    /// The dispatched challenges, once loaded
    pub fn challenges(&self) -> &[Challenge] {
        &self.challenges
    }

    /// Find a challenge by its type string
    pub fn find_challenge(&self, type_name: &str) -> Option<&Challenge> {
        self.challenges.iter().find(|c| c.type_name() == type_name)
    }

    /// Find a challenge by its type string, mutably (to trigger or poll it)
    pub fn find_challenge_mut(&mut self, type_name: &str) -> Option<&mut Challenge> {
        self.challenges
            .iter_mut()
            .find(|c| c.type_name() == type_name)
    }

    /// Re-fetch the authorization document, replacing the cache
    pub async fn fetch(&mut self) -> Result<&AuthorizationData> {
        self.refresh().await?;
        Ok(self.data.as_ref().unwrap())
    }

    /// Load the authorization document if it is not cached yet
    pub async fn load(&mut self) -> Result<&AuthorizationData> {
        if self.data.is_none() {
            self.fetch().await?;
        }
        Ok(self.data.as_ref().unwrap())
    }

    async fn refresh(&mut self) -> Result<(AuthorizationStatus, Option<Duration>)> {
        let response = Connection::new(self.login.session())
            .post_as_get(
                &self.url,
                self.login.key().as_ref(),
                JwsIdentity::AccountUrl(self.login.account_url()),
            )
            .await?;
        self.apply(response.require_json()?.clone())?;
        Ok((self.data.as_ref().unwrap().status, response.retry_after))
    }

    fn apply(&mut self, value: Value) -> Result<()> {
        let data: AuthorizationData = serde_json::from_value(value)?;
        let registry = self.login.session().challenges();
        self.challenges = data
            .challenges
            .iter()
            .map(|raw| registry.dispatch(&self.login, raw.clone()))
            .collect::<Result<Vec<_>>>()?;
        self.data = Some(data);
        Ok(())
    }

    /// Deactivate this authorization; pending challenges are abandoned
    pub async fn deactivate(&mut self) -> Result<()> {
        info!(authorization = self.url(), "Deactivating authorization");
        let response = Connection::new(self.login.session())
            .send(
                &self.url,
                Some(&json!({ "status": "deactivated" })),
                self.login.key().as_ref(),
                JwsIdentity::AccountUrl(self.login.account_url()),
            )
            .await?;
        self.apply(response.require_json()?.clone())
    }

    /// Poll until the authorization reaches `target` or another terminal
    /// status
    pub async fn poll_until(
        &mut self,
        target: AuthorizationStatus,
        options: &PollOptions,
    ) -> Result<AuthorizationStatus> {
        wait_for(self, target, options).await
    }

    /// Poll until a triggered challenge makes this authorization `valid`
    pub async fn wait_until_valid(&mut self, options: &PollOptions) -> Result<AuthorizationStatus> {
        self.poll_until(AuthorizationStatus::Valid, options).await
    }
}

impl Pollable for Authorization {
    type Status = AuthorizationStatus;

    async fn poll_once(&mut self) -> Result<(AuthorizationStatus, Option<Duration>)> {
        self.refresh().await
    }
}
