/// Common types for the ACME protocol
use crate::error::{AcmeError, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Identifier for an order or authorization
///
/// Values are normalized on construction: DNS names to their ASCII A-label
/// form, IP addresses to the canonical textual form (compressed lowercase
/// IPv6), email addresses to the bare mailbox. Equality is case-sensitive
/// structural equality of both fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Identifier {
    /// Type: "dns", "ip" or "email"
    #[serde(rename = "type")]
    pub id_type: String,
    /// Value: domain name, IP address or mailbox
    pub value: String,
}

impl Identifier {
    /// Create a DNS identifier; Unicode names are Punycode-encoded
    pub fn dns(domain: impl AsRef<str>) -> Result<Self> {
        let ascii = idna::domain_to_ascii(domain.as_ref())
            .map_err(|e| AcmeError::invalid_input(format!("Invalid domain name: {e}")))?;
        Ok(Self {
            id_type: "dns".to_string(),
            value: ascii,
        })
    }

    /// Create an IP identifier from its textual form
    pub fn ip(addr: impl AsRef<str>) -> Result<Self> {
        let parsed: IpAddr = addr
            .as_ref()
            .parse()
            .map_err(|e| AcmeError::invalid_input(format!("Invalid IP address: {e}")))?;
        Ok(Self::from_ip_addr(parsed))
    }

    /// Create an IP identifier from a parsed address
    pub fn from_ip_addr(addr: IpAddr) -> Self {
        Self {
            id_type: "ip".to_string(),
            value: addr.to_string(),
        }
    }

    /// Create an email identifier from an RFC 5321 mailbox
    pub fn email(mailbox: impl Into<String>) -> Result<Self> {
        let mailbox = mailbox.into();
        if !mailbox.contains('@') || mailbox.contains(['<', '>', ' ']) {
            return Err(AcmeError::invalid_input(format!(
                "Not a bare mailbox: {mailbox}"
            )));
        }
        Ok(Self {
            id_type: "email".to_string(),
            value: mailbox,
        })
    }

    /// True if this is a DNS identifier
    pub fn is_dns(&self) -> bool {
        self.id_type == "dns"
    }

    /// The domain name, if this is a DNS identifier
    pub fn dns_name(&self) -> Option<&str> {
        self.is_dns().then_some(self.value.as_str())
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.id_type, self.value)
    }
}

/// Contact information for an account
#[derive(Debug, Clone)]
pub struct Contact {
    /// Email address
    pub email: Option<String>,
    /// URL
    pub url: Option<String>,
}

impl Contact {
    /// Create email contact
    pub fn email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            url: None,
        }
    }

    /// Create URL contact
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            email: None,
            url: Some(url.into()),
        }
    }

    /// Convert to ACME URI format
    pub fn to_uri(&self) -> String {
        if let Some(email) = &self.email {
            format!("mailto:{}", email)
        } else if let Some(url) = &self.url {
            url.clone()
        } else {
            String::new()
        }
    }
}

/// Certificate revocation reason (RFC 5280 §5.3.1)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[repr(u8)]
pub enum RevocationReason {
    /// Reason unspecified
    Unspecified = 0,
    /// Key compromise
    KeyCompromise = 1,
    /// CA compromise
    CaCompromise = 2,
    /// Affiliation changed
    AffiliationChanged = 3,
    /// Superseded
    Superseded = 4,
    /// Cessation of operation
    CessationOfOperation = 5,
    /// Certificate hold
    CertificateHold = 6,
    /// Remove from CRL
    RemoveFromCRL = 8,
    /// Privilege withdrawn
    PrivilegeWithdrawn = 9,
    /// AA compromise
    AACompromise = 10,
}

impl RevocationReason {
    /// Get the numeric value
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Account is usable
    Valid,
    /// Deactivated by the client
    Deactivated,
    /// Revoked by the server
    Revoked,
}

impl AccountStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Valid => "valid",
            AccountStatus::Deactivated => "deactivated",
            AccountStatus::Revoked => "revoked",
        }
    }

    /// True if the account can no longer be used
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AccountStatus::Valid)
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Awaiting authorizations
    Pending,
    /// All authorizations valid; ready for finalization
    Ready,
    /// Finalization in progress
    Processing,
    /// Certificate issued
    Valid,
    /// Order failed
    Invalid,
}

impl OrderStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Ready => "ready",
            OrderStatus::Processing => "processing",
            OrderStatus::Valid => "valid",
            OrderStatus::Invalid => "invalid",
        }
    }

    /// True if the order cannot advance further
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Valid | OrderStatus::Invalid)
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "ready" => Ok(OrderStatus::Ready),
            "processing" => Ok(OrderStatus::Processing),
            "valid" => Ok(OrderStatus::Valid),
            "invalid" => Ok(OrderStatus::Invalid),
            _ => Err(format!("Unknown order status: {}", s)),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Authorization status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationStatus {
    /// Awaiting a successful challenge
    Pending,
    /// Proof of control accepted
    Valid,
    /// A challenge failed
    Invalid,
    /// Deactivated by the client
    Deactivated,
    /// Expired before validation
    Expired,
    /// Revoked by the server
    Revoked,
}

impl AuthorizationStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationStatus::Pending => "pending",
            AuthorizationStatus::Valid => "valid",
            AuthorizationStatus::Invalid => "invalid",
            AuthorizationStatus::Deactivated => "deactivated",
            AuthorizationStatus::Expired => "expired",
            AuthorizationStatus::Revoked => "revoked",
        }
    }

    /// True if the authorization cannot advance further
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AuthorizationStatus::Pending)
    }
}

impl std::fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Challenge status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    /// Not yet triggered
    Pending,
    /// Validation in progress
    Processing,
    /// Validation succeeded
    Valid,
    /// Validation failed
    Invalid,
}

impl ChallengeStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeStatus::Pending => "pending",
            ChallengeStatus::Processing => "processing",
            ChallengeStatus::Valid => "valid",
            ChallengeStatus::Invalid => "invalid",
        }
    }

    /// True if the challenge cannot advance further
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChallengeStatus::Valid | ChallengeStatus::Invalid)
    }
}

impl std::fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
