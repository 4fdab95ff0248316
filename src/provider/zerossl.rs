/// ZeroSSL provider
use crate::error::{AcmeError, Result};
use crate::provider::AcmeProvider;
use async_trait::async_trait;
use url::Url;

const DIRECTORY_URL: &str = "https://acme.zerossl.com/v2/DV90";

/// Resolves `acme://zerossl.com`; account creation requires an external
/// account binding with an HS256 MAC
pub struct ZeroSslProvider;

#[async_trait]
impl AcmeProvider for ZeroSslProvider {
    fn name(&self) -> &'static str {
        "zerossl"
    }

    fn accepts(&self, uri: &Url) -> bool {
        uri.scheme() == "acme" && uri.host_str() == Some("zerossl.com")
    }

    fn resolve(&self, uri: &Url) -> Result<String> {
        match uri.path() {
            "" | "/" => Ok(DIRECTORY_URL.to_string()),
            other => Err(AcmeError::configuration(format!(
                "Unknown ZeroSSL variant: {}",
                other.trim_start_matches('/')
            ))),
        }
    }

    fn eab_mac_algorithm(&self) -> Option<&'static str> {
        Some("HS256")
    }
}
