//! Configuration for ACME client sessions
//!
//! Supports TOML configuration files, `${VAR}` environment expansion,
//! environment variable overrides and validation.

use crate::error::{AcmeError, Result};
use crate::resource::EabCredentials;
use crate::transport::TransportSettings;
use crate::types::Contact;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub acme: AcmeSettings,

    #[serde(default)]
    pub transport: HttpSettings,
}

/// ACME protocol settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcmeSettings {
    /// Server URI: `acme://<host>[/<variant>]` or a plain directory URL
    #[serde(default = "default_server_uri")]
    pub server: String,

    /// Contact email addresses
    #[serde(default)]
    pub contact: Vec<String>,

    /// Agree to the terms of service
    #[serde(default)]
    pub tos_agreed: bool,

    /// External account binding (optional)
    #[serde(default)]
    pub external_account_binding: Option<EabSettings>,
}

/// External account binding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EabSettings {
    /// Key identifier issued by the CA
    pub key_id: String,
    /// MAC key, base64url encoded; supports `${VAR}` syntax
    pub hmac_key: String,
}

/// HTTP transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Read timeout in seconds
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    /// Proxy URL
    #[serde(default)]
    pub proxy: Option<String>,

    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,

    /// `Accept-Language` tag sent with every request
    #[serde(default)]
    pub accept_language: Option<String>,

    /// Paths of additional trusted root certificates (PEM files)
    #[serde(default)]
    pub pinned_roots: Vec<String>,
}

fn default_server_uri() -> String {
    "acme://letsencrypt.org".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    30
}

impl Default for AcmeSettings {
    fn default() -> Self {
        Self {
            server: default_server_uri(),
            contact: Vec::new(),
            tos_agreed: false,
            external_account_binding: None,
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            proxy: None,
            user_agent: None,
            accept_language: None,
            pinned_roots: Vec::new(),
        }
    }
}

impl Config {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AcmeError::configuration(format!("Failed to read config file: {}", e)))?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| AcmeError::configuration(format!("Failed to parse TOML: {}", e)))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(server) = env::var("ACMEKIT_SERVER") {
            self.acme.server = Self::expand_env_var(&server)?;
        }
        if let Ok(proxy) = env::var("ACMEKIT_PROXY") {
            self.transport.proxy = Some(Self::expand_env_var(&proxy)?);
        }
        if let Ok(language) = env::var("ACMEKIT_ACCEPT_LANGUAGE") {
            self.transport.accept_language = Some(language);
        }
        Ok(())
    }

    /// Expand environment variables in format `${VAR}`
    pub fn expand_env_var(value: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}")
            .map_err(|_| AcmeError::configuration("Invalid regex pattern"))?;

        let result = re
            .replace_all(value, |caps: &regex::Captures| {
                let var_name = &caps[1];
                env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string();

        Ok(result)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.acme.server.is_empty() {
            return Err(AcmeError::configuration("Server URI cannot be empty"));
        }
        if let Some(eab) = &self.acme.external_account_binding
            && (eab.key_id.is_empty() || eab.hmac_key.is_empty())
        {
            return Err(AcmeError::configuration(
                "External account binding needs key_id and hmac_key",
            ));
        }
        if self.transport.connect_timeout_secs == 0 || self.transport.read_timeout_secs == 0 {
            return Err(AcmeError::configuration("Timeouts must be greater than 0"));
        }
        Ok(())
    }

    /// The contact list as ACME contact values
    pub fn contacts(&self) -> Vec<Contact> {
        self.acme.contact.iter().map(Contact::email).collect()
    }

    /// External account binding credentials, if configured
    pub fn eab_credentials(&self) -> Result<Option<EabCredentials>> {
        match &self.acme.external_account_binding {
            Some(eab) => Ok(Some(EabCredentials {
                key_id: eab.key_id.clone(),
                hmac_key: Self::expand_env_var(&eab.hmac_key)?,
            })),
            None => Ok(None),
        }
    }

    /// Materialize transport settings, reading pinned root files from disk
    pub fn transport_settings(&self) -> Result<TransportSettings> {
        let mut settings = TransportSettings {
            connect_timeout: Duration::from_secs(self.transport.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.transport.read_timeout_secs),
            proxy: self.transport.proxy.clone(),
            accept_language: self.transport.accept_language.clone(),
            ..TransportSettings::default()
        };
        if let Some(user_agent) = &self.transport.user_agent {
            settings.user_agent = user_agent.clone();
        }
        for path in &self.transport.pinned_roots {
            settings.pinned_roots.push(std::fs::read(path)?);
        }
        Ok(settings)
    }
}
