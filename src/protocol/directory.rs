/// ACME directory and its metadata
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Endpoints a directory may advertise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Nonce priming endpoint
    NewNonce,
    /// Account creation endpoint
    NewAccount,
    /// Order creation endpoint
    NewOrder,
    /// Pre-authorization endpoint (optional)
    NewAuthz,
    /// Certificate revocation endpoint
    RevokeCert,
    /// Account key rollover endpoint
    KeyChange,
    /// ACME Renewal Information endpoint (optional)
    RenewalInfo,
}

impl ResourceKind {
    /// The directory key for this endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::NewNonce => "newNonce",
            ResourceKind::NewAccount => "newAccount",
            ResourceKind::NewOrder => "newOrder",
            ResourceKind::NewAuthz => "newAuthz",
            ResourceKind::RevokeCert => "revokeCert",
            ResourceKind::KeyChange => "keyChange",
            ResourceKind::RenewalInfo => "renewalInfo",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// ACME directory response
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Directory {
    /// New nonce endpoint
    #[serde(rename = "newNonce")]
    pub new_nonce: Option<String>,

    /// New account endpoint
    #[serde(rename = "newAccount")]
    pub new_account: Option<String>,

    /// New order endpoint
    #[serde(rename = "newOrder")]
    pub new_order: Option<String>,

    /// Pre-authorization endpoint
    #[serde(rename = "newAuthz")]
    pub new_authz: Option<String>,

    /// Revoke certificate endpoint
    #[serde(rename = "revokeCert")]
    pub revoke_cert: Option<String>,

    /// Key change endpoint
    #[serde(rename = "keyChange")]
    pub key_change: Option<String>,

    /// ACME Renewal Information endpoint
    #[serde(rename = "renewalInfo")]
    pub renewal_info: Option<String>,

    /// Directory metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Metadata>,
}

impl Directory {
    /// The URL advertised for the given endpoint, if any
    pub fn url_for(&self, kind: ResourceKind) -> Option<&str> {
        let url = match kind {
            ResourceKind::NewNonce => &self.new_nonce,
            ResourceKind::NewAccount => &self.new_account,
            ResourceKind::NewOrder => &self.new_order,
            ResourceKind::NewAuthz => &self.new_authz,
            ResourceKind::RevokeCert => &self.revoke_cert,
            ResourceKind::KeyChange => &self.key_change,
            ResourceKind::RenewalInfo => &self.renewal_info,
        };
        url.as_deref()
    }
}

/// Directory metadata (`meta` subobject)
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Metadata {
    /// Terms of Service URL
    #[serde(rename = "termsOfService")]
    pub terms_of_service: Option<String>,

    /// Website URL
    pub website: Option<String>,

    /// CAA identities recognized by this CA
    #[serde(rename = "caaIdentities")]
    pub caa_identities: Option<Vec<String>>,

    /// Whether account creation requires an external account binding
    #[serde(rename = "externalAccountRequired")]
    pub external_account_required: Option<bool>,

    /// Certificate profiles offered by this CA (name to description)
    pub profiles: Option<HashMap<String, String>>,

    /// Short-term automatic renewal parameters (RFC 8739)
    #[serde(rename = "auto-renewal")]
    pub auto_renewal: Option<serde_json::Value>,
}

impl Metadata {
    /// True if account creation requires an external account binding
    pub fn requires_external_account(&self) -> bool {
        self.external_account_required.unwrap_or(false)
    }

    /// True if the CA advertises auto-renewal support
    pub fn supports_auto_renewal(&self) -> bool {
        self.auto_renewal.is_some()
    }
}
