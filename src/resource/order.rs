/// Order lifecycle: creation, finalization, certificate download
use crate::connection::{Connection, ResponseBody};
use crate::error::{AcmeError, Result};
use crate::problem::Problem;
use crate::protocol::ResourceKind;
use crate::protocol::jws::JwsIdentity;
use crate::resource::authorization::Authorization;
use crate::resource::certificate::CertificateChain;
use crate::resource::{PollOptions, Pollable, wait_for};
use crate::session::Login;
use crate::types::{Identifier, OrderStatus};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::info;

/// Cached order document
#[derive(Debug, Clone, Deserialize)]
pub struct OrderData {
    /// Order status
    pub status: OrderStatus,

    /// Expiration of this order
    #[serde(default)]
    pub expires: Option<jiff::Timestamp>,

    /// Identifiers this order covers
    pub identifiers: Vec<Identifier>,

    /// Authorization URLs to satisfy
    pub authorizations: Vec<String>,

    /// Finalization URL
    pub finalize: String,

    /// Certificate URL, set once the order is valid
    #[serde(default)]
    pub certificate: Option<String>,

    /// Requested notBefore hint
    #[serde(rename = "notBefore", default)]
    pub not_before: Option<jiff::Timestamp>,

    /// Requested notAfter hint
    #[serde(rename = "notAfter", default)]
    pub not_after: Option<jiff::Timestamp>,

    /// Certificate profile this order was created under
    #[serde(default)]
    pub profile: Option<String>,

    /// Why the order became invalid, if it did
    #[serde(default)]
    pub error: Option<Problem>,
}

/// Builder for order creation (`newOrder`)
#[derive(Debug, Clone, Serialize)]
pub struct NewOrder {
    identifiers: Vec<Identifier>,

    #[serde(rename = "notBefore", skip_serializing_if = "Option::is_none")]
    not_before: Option<jiff::Timestamp>,

    #[serde(rename = "notAfter", skip_serializing_if = "Option::is_none")]
    not_after: Option<jiff::Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<String>,

    /// ARI certificate identifier of the certificate this order replaces
    #[serde(skip_serializing_if = "Option::is_none")]
    replaces: Option<String>,
}

impl NewOrder {
    /// Order a certificate for the given identifiers
    pub fn new(identifiers: Vec<Identifier>) -> Self {
        Self {
            identifiers,
            not_before: None,
            not_after: None,
            profile: None,
            replaces: None,
        }
    }

    /// Order a certificate for a set of DNS names
    pub fn dns(domains: &[&str]) -> Result<Self> {
        let identifiers = domains
            .iter()
            .map(Identifier::dns)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(identifiers))
    }

    /// Set the requested notBefore instant
    pub fn with_not_before(mut self, not_before: jiff::Timestamp) -> Self {
        self.not_before = Some(not_before);
        self
    }

    /// Set the requested notAfter instant
    pub fn with_not_after(mut self, not_after: jiff::Timestamp) -> Self {
        self.not_after = Some(not_after);
        self
    }

    /// Request a certificate profile advertised in the directory metadata
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Mark which certificate this order replaces (ARI)
    pub fn replaces(mut self, certificate_id: impl Into<String>) -> Self {
        self.replaces = Some(certificate_id.into());
        self
    }

    /// Create the order
    pub async fn create(self, login: &Login) -> Result<Order> {
        if self.identifiers.is_empty() {
            return Err(AcmeError::invalid_input("Order needs at least one identifier"));
        }

        let session = login.session();
        let new_order_url = session.resource_url(ResourceKind::NewOrder).await?;
        let payload = serde_json::to_value(&self)?;

        let response = Connection::new(session)
            .send(
                &new_order_url,
                Some(&payload),
                login.key().as_ref(),
                JwsIdentity::AccountUrl(login.account_url()),
            )
            .await?;

        let url = response.require_location()?;
        let data: OrderData = serde_json::from_value(response.require_json()?.clone())?;

        info!(order = %url, status = %data.status, "Order created");
        Ok(Order {
            login: login.clone(),
            url,
            data: Some(data),
        })
    }
}

/// An order resource located by its URL
pub struct Order {
    login: Login,
    url: String,
    data: Option<OrderData>,
}

impl std::fmt::Debug for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Order")
            .field("url", &self.url)
            .field("data", &self.data)
            .finish()
    }
}

impl Order {
    /// Bind an order to its URL without fetching it
    pub fn bind(login: Login, url: impl Into<String>) -> Self {
        Self {
            login,
            url: url.into(),
            data: None,
        }
    }

    /// The immutable order URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The cached order document, if loaded
    pub fn data(&self) -> Option<&OrderData> {
        self.data.as_ref()
    }

    /// The cached status, if loaded
    pub fn status(&self) -> Option<OrderStatus> {
        self.data.as_ref().map(|d| d.status)
    }

    /// True if the cached status is `pending`
    pub fn is_pending(&self) -> bool {
        self.status() == Some(OrderStatus::Pending)
    }

    /// True if the cached status is `ready`
    pub fn is_ready(&self) -> bool {
        self.status() == Some(OrderStatus::Ready)
    }

    /// True if the cached status is `valid`
    pub fn is_valid(&self) -> bool {
        self.status() == Some(OrderStatus::Valid)
    }

    /// True if the cached status is `invalid`
    pub fn is_invalid(&self) -> bool {
        self.status() == Some(OrderStatus::Invalid)
    }

    /// Re-fetch the order document, replacing the cache
    pub async fn fetch(&mut self) -> Result<&OrderData> {
        self.refresh().await?;
        Ok(self.data.as_ref().unwrap())
    }

    /// Load the order document if it is not cached yet
    pub async fn load(&mut self) -> Result<&OrderData> {
        if self.data.is_none() {
            self.fetch().await?;
        }
        Ok(self.data.as_ref().unwrap())
    }

    async fn refresh(&mut self) -> Result<(OrderStatus, Option<Duration>)> {
        let response = Connection::new(self.login.session())
            .post_as_get(
                &self.url,
                self.login.key().as_ref(),
                JwsIdentity::AccountUrl(self.login.account_url()),
            )
            .await?;
        let data: OrderData = serde_json::from_value(response.require_json()?.clone())?;
        let status = data.status;
        self.data = Some(data);
        Ok((status, response.retry_after))
    }

    /// Authorizations this order depends on, bound but not yet fetched
    pub async fn authorizations(&mut self) -> Result<Vec<Authorization>> {
        let data = self.load().await?;
        Ok(data
            .authorizations
            .clone()
            .into_iter()
            .map(|url| Authorization::bind(self.login.clone(), url))
            .collect())
    }

    /// Finalize the order with a DER-encoded CSR
    ///
    /// Valid only when the order is `ready`; the CSR is an opaque byte
    /// stream produced by the caller.
    pub async fn finalize(&mut self, csr_der: &[u8]) -> Result<OrderStatus> {
        let status = self.load().await?.status;
        if status != OrderStatus::Ready {
            return Err(AcmeError::invalid_state(
                "order".to_string(),
                status.to_string(),
            ));
        }

        let finalize_url = self.data.as_ref().unwrap().finalize.clone();
        let payload = json!({ "csr": URL_SAFE_NO_PAD.encode(csr_der) });

        info!(order = %self.url, "Finalizing order");
        let response = Connection::new(self.login.session())
            .send(
                &finalize_url,
                Some(&payload),
                self.login.key().as_ref(),
                JwsIdentity::AccountUrl(self.login.account_url()),
            )
            .await?;

        let data: OrderData = serde_json::from_value(response.require_json()?.clone())?;
        let status = data.status;
        self.data = Some(data);
        Ok(status)
    }

    /// Download the issued certificate chain, leaf first
    ///
    /// Available only when the order is `valid`.
    pub async fn download_certificate(&mut self) -> Result<CertificateChain> {
        let data = self.load().await?;
        if data.status != OrderStatus::Valid {
            return Err(AcmeError::invalid_state(
                "order".to_string(),
                data.status.to_string(),
            ));
        }
        let certificate_url = data
            .certificate
            .clone()
            .ok_or_else(|| AcmeError::protocol("Valid order without certificate URL"))?;

        let response = Connection::new(self.login.session())
            .post_as_get(
                &certificate_url,
                self.login.key().as_ref(),
                JwsIdentity::AccountUrl(self.login.account_url()),
            )
            .await?;

        let alternates = response.links("alternate");
        match response.body {
            ResponseBody::Certificates(certificates) => {
                Ok(CertificateChain::new(certificates, alternates))
            }
            _ => Err(AcmeError::protocol("Expected a PEM certificate chain")),
        }
    }

    /// Poll until the order reaches `target` or another terminal status
    pub async fn poll_until(
        &mut self,
        target: OrderStatus,
        options: &PollOptions,
    ) -> Result<OrderStatus> {
        wait_for(self, target, options).await
    }

    /// Poll until all authorizations are satisfied and the order is `ready`
    pub async fn wait_until_ready(&mut self, options: &PollOptions) -> Result<OrderStatus> {
        self.poll_until(OrderStatus::Ready, options).await
    }

    /// Poll until finalization completes and the order is `valid`
    pub async fn wait_until_valid(&mut self, options: &PollOptions) -> Result<OrderStatus> {
        self.poll_until(OrderStatus::Valid, options).await
    }
}

impl Pollable for Order {
    type Status = OrderStatus;

    async fn poll_once(&mut self) -> Result<(OrderStatus, Option<Duration>)> {
        self.refresh().await
    }
}
