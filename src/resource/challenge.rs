/// Challenges and the type-string to variant dispatch
use crate::connection::Connection;
use crate::crypto::KeyAuthorization;
use crate::crypto::key_auth;
use crate::error::{AcmeError, Result};
use crate::problem::Problem;
use crate::protocol::jws::JwsIdentity;
use crate::resource::{PollOptions, Pollable, wait_for};
use crate::session::Login;
use crate::types::ChallengeStatus;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Built-in challenge type strings
pub const HTTP_01: &str = "http-01";
pub const DNS_01: &str = "dns-01";
pub const DNS_ACCOUNT_01: &str = "dns-account-01";
pub const TLS_ALPN_01: &str = "tls-alpn-01";
pub const EMAIL_REPLY_00: &str = "email-reply-00";

/// Base fields shared by every challenge
#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeData {
    /// Challenge type string; immutable for the challenge's lifetime
    #[serde(rename = "type")]
    pub challenge_type: String,

    /// Challenge URL
    pub url: String,

    /// Challenge status
    pub status: ChallengeStatus,

    /// Token for key authorizations (token-bearing types)
    #[serde(default)]
    pub token: Option<String>,

    /// When the server validated this challenge
    #[serde(default)]
    pub validated: Option<jiff::Timestamp>,

    /// Validation error, if the challenge failed
    #[serde(default)]
    pub error: Option<Problem>,

    /// Sender address of the challenge email (email-reply-00)
    #[serde(default)]
    pub from: Option<String>,
}

/// The dispatched challenge variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeKind {
    /// Key authorization served over HTTP (RFC 8555 §8.3)
    Http01,
    /// TXT record under `_acme-challenge` (RFC 8555 §8.4)
    Dns01,
    /// Account-scoped TXT record
    DnsAccount01,
    /// TLS handshake with the acmeIdentifier extension (RFC 8737)
    TlsAlpn01,
    /// Reply to a challenge email (RFC 8823)
    EmailReply00,
    /// Third-party type registered by a plug-in
    Custom(String),
    /// Unregistered type; raw JSON preserved, no typed accessors
    Unknown(String),
}

impl ChallengeKind {
    /// The challenge type string
    pub fn type_name(&self) -> &str {
        match self {
            ChallengeKind::Http01 => HTTP_01,
            ChallengeKind::Dns01 => DNS_01,
            ChallengeKind::DnsAccount01 => DNS_ACCOUNT_01,
            ChallengeKind::TlsAlpn01 => TLS_ALPN_01,
            ChallengeKind::EmailReply00 => EMAIL_REPLY_00,
            ChallengeKind::Custom(name) | ChallengeKind::Unknown(name) => name,
        }
    }
}

/// Constructor from base fields to a dispatched variant
pub type ChallengeConstructor = Arc<dyn Fn(&ChallengeData) -> Result<ChallengeKind> + Send + Sync>;

/// Maps challenge type strings to variant constructors
///
/// Built-in types are always registered; third-party types plug in through
/// `register`. Unknown types fall through to the opaque variant.
pub struct ChallengeRegistry {
    constructors: HashMap<String, ChallengeConstructor>,
    built_in: HashSet<String>,
}

fn token_bearing(kind: ChallengeKind) -> ChallengeConstructor {
    Arc::new(move |data| {
        if data.token.is_none() {
            return Err(AcmeError::protocol(format!(
                "Challenge {} has no token",
                data.challenge_type
            )));
        }
        Ok(kind.clone())
    })
}

impl ChallengeRegistry {
    /// Registry with all built-in challenge types
    pub fn builtin() -> Self {
        let mut registry = Self {
            constructors: HashMap::new(),
            built_in: HashSet::new(),
        };
        for (name, kind) in [
            (HTTP_01, ChallengeKind::Http01),
            (DNS_01, ChallengeKind::Dns01),
            (DNS_ACCOUNT_01, ChallengeKind::DnsAccount01),
            (TLS_ALPN_01, ChallengeKind::TlsAlpn01),
            (EMAIL_REPLY_00, ChallengeKind::EmailReply00),
        ] {
            registry
                .constructors
                .insert(name.to_string(), token_bearing(kind));
            registry.built_in.insert(name.to_string());
        }
        registry
    }

    /// Register a third-party challenge type
    ///
    /// Registering over a built-in type, or twice for the same name, is an
    /// error.
    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        constructor: ChallengeConstructor,
    ) -> Result<()> {
        let type_name = type_name.into();
        if self.built_in.contains(&type_name) {
            return Err(AcmeError::invalid_input(format!(
                "Cannot replace built-in challenge type {}",
                type_name
            )));
        }
        if self.constructors.contains_key(&type_name) {
            return Err(AcmeError::invalid_input(format!(
                "Challenge type {} already registered",
                type_name
            )));
        }
        self.constructors.insert(type_name, constructor);
        Ok(())
    }

    /// Materialize a challenge from its JSON document
    pub fn dispatch(&self, login: &Login, raw: Value) -> Result<Challenge> {
        let data: ChallengeData = serde_json::from_value(raw.clone())?;
        let kind = match self.constructors.get(&data.challenge_type) {
            Some(constructor) => constructor(&data)?,
            None => ChallengeKind::Unknown(data.challenge_type.clone()),
        };
        Ok(Challenge {
            login: login.clone(),
            kind,
            data,
            raw,
        })
    }
}

/// A challenge resource
pub struct Challenge {
    login: Login,
    kind: ChallengeKind,
    data: ChallengeData,
    raw: Value,
}

impl Challenge {
    /// The dispatched variant
    pub fn kind(&self) -> &ChallengeKind {
        &self.kind
    }

    /// The challenge type string
    pub fn type_name(&self) -> &str {
        &self.data.challenge_type
    }

    /// The challenge URL
    pub fn url(&self) -> &str {
        &self.data.url
    }

    /// Current status
    pub fn status(&self) -> ChallengeStatus {
        self.data.status
    }

    /// When the server validated this challenge
    pub fn validated(&self) -> Option<jiff::Timestamp> {
        self.data.validated
    }

    /// Validation error, if the challenge failed
    pub fn error(&self) -> Option<&Problem> {
        self.data.error.as_ref()
    }

    /// The raw challenge document
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// The token, for all but opaque unknown types
    pub fn token(&self) -> Option<&str> {
        match self.kind {
            ChallengeKind::Unknown(_) => None,
            _ => self.data.token.as_deref(),
        }
    }

    fn require_token(&self) -> Result<&str> {
        self.token().ok_or_else(|| {
            AcmeError::invalid_state(self.type_name().to_string(), "tokenless".to_string())
        })
    }

    /// Key authorization for this challenge's token
    pub fn key_authorization(&self) -> Result<KeyAuthorization> {
        KeyAuthorization::for_key(self.require_token()?, self.login.key().as_ref())
    }

    /// http-01: path at which the key authorization must be served
    pub fn http01_path(&self) -> Result<String> {
        self.expect_kind(&ChallengeKind::Http01)?;
        Ok(key_auth::http01_path(self.require_token()?))
    }

    /// dns-01 / dns-account-01: value of the TXT record
    pub fn txt_digest(&self) -> Result<String> {
        match self.kind {
            ChallengeKind::Dns01 | ChallengeKind::DnsAccount01 => {
                Ok(self.key_authorization()?.dns01_digest())
            }
            _ => Err(self.wrong_kind()),
        }
    }

    /// dns-01 / dns-account-01: owner name of the TXT record for a domain
    pub fn txt_record_name(&self, domain: &str) -> Result<String> {
        match self.kind {
            ChallengeKind::Dns01 => Ok(key_auth::dns01_record_name(domain)),
            ChallengeKind::DnsAccount01 => Ok(key_auth::dns_account01_record_name(
                self.login.account_url(),
                domain,
            )),
            _ => Err(self.wrong_kind()),
        }
    }

    /// tls-alpn-01: digest for the acmeIdentifier certificate extension
    pub fn tls_alpn01_digest(&self) -> Result<[u8; 32]> {
        self.expect_kind(&ChallengeKind::TlsAlpn01)?;
        Ok(self.key_authorization()?.tls_alpn01_digest())
    }

    /// email-reply-00: sender of the CA's challenge email
    pub fn email_from(&self) -> Result<Option<&str>> {
        self.expect_kind(&ChallengeKind::EmailReply00)?;
        Ok(self.data.from.as_deref())
    }

    /// email-reply-00: key authorization over the full token, combining the
    /// token part from the email subject with the challenge object's part
    pub fn email_key_authorization(&self, subject_token_part: &str) -> Result<KeyAuthorization> {
        self.expect_kind(&ChallengeKind::EmailReply00)?;
        let full_token =
            key_auth::email_reply_full_token(subject_token_part, self.require_token()?);
        KeyAuthorization::for_key(&full_token, self.login.key().as_ref())
    }

    fn expect_kind(&self, kind: &ChallengeKind) -> Result<()> {
        if self.kind == *kind {
            Ok(())
        } else {
            Err(self.wrong_kind())
        }
    }

    fn wrong_kind(&self) -> AcmeError {
        AcmeError::invalid_input(format!(
            "Not available for challenge type {}",
            self.type_name()
        ))
    }

    /// Tell the server to validate this challenge (POST `{}`)
    ///
    /// The server advances the status asynchronously; poll the challenge or
    /// its authorization afterwards.
    pub async fn trigger(&mut self) -> Result<()> {
        info!(url = self.url(), "Triggering challenge");
        let response = Connection::new(self.login.session())
            .send(
                &self.data.url,
                Some(&json!({})),
                self.login.key().as_ref(),
                JwsIdentity::AccountUrl(self.login.account_url()),
            )
            .await?;
        self.apply(response.require_json()?.clone())
    }

    /// Re-fetch the challenge document
    pub async fn fetch(&mut self) -> Result<ChallengeStatus> {
        let (status, _) = self.refresh().await?;
        Ok(status)
    }

    async fn refresh(&mut self) -> Result<(ChallengeStatus, Option<Duration>)> {
        let response = Connection::new(self.login.session())
            .post_as_get(
                &self.data.url,
                self.login.key().as_ref(),
                JwsIdentity::AccountUrl(self.login.account_url()),
            )
            .await?;
        self.apply(response.require_json()?.clone())?;
        Ok((self.data.status, response.retry_after))
    }

    fn apply(&mut self, raw: Value) -> Result<()> {
        let data: ChallengeData = serde_json::from_value(raw.clone())?;
        if data.challenge_type != self.data.challenge_type {
            return Err(AcmeError::protocol(format!(
                "Challenge type changed from {} to {}",
                self.data.challenge_type, data.challenge_type
            )));
        }
        self.data = data;
        self.raw = raw;
        Ok(())
    }

    /// Poll until the challenge reaches `target` or another terminal status
    pub async fn poll_until(
        &mut self,
        target: ChallengeStatus,
        options: &PollOptions,
    ) -> Result<ChallengeStatus> {
        wait_for(self, target, options).await
    }
}

impl Pollable for Challenge {
    type Status = ChallengeStatus;

    async fn poll_once(&mut self) -> Result<(ChallengeStatus, Option<Duration>)> {
        self.refresh().await
    }
}
