/// Let's Encrypt provider
use crate::error::{AcmeError, Result};
use crate::provider::AcmeProvider;
use async_trait::async_trait;
use url::Url;

const PRODUCTION_URL: &str = "https://acme-v02.api.letsencrypt.org/directory";
const STAGING_URL: &str = "https://acme-staging-v02.api.letsencrypt.org/directory";

/// Resolves `acme://letsencrypt.org` and its `staging` variant
pub struct LetsEncryptProvider;

#[async_trait]
impl AcmeProvider for LetsEncryptProvider {
    fn name(&self) -> &'static str {
        "letsencrypt"
    }

    fn accepts(&self, uri: &Url) -> bool {
        uri.scheme() == "acme" && uri.host_str() == Some("letsencrypt.org")
    }

    fn resolve(&self, uri: &Url) -> Result<String> {
        match uri.path() {
            "" | "/" => Ok(PRODUCTION_URL.to_string()),
            "/staging" => Ok(STAGING_URL.to_string()),
            other => Err(AcmeError::configuration(format!(
                "Unknown Let's Encrypt variant: {}",
                other.trim_start_matches('/')
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_and_staging_variants() {
        let provider = LetsEncryptProvider;

        let uri = Url::parse("acme://letsencrypt.org").unwrap();
        assert!(provider.accepts(&uri));
        assert_eq!(provider.resolve(&uri).unwrap(), PRODUCTION_URL);

        let uri = Url::parse("acme://letsencrypt.org/staging").unwrap();
        assert_eq!(provider.resolve(&uri).unwrap(), STAGING_URL);
    }

    #[test]
    fn test_unknown_variant_rejected() {
        let provider = LetsEncryptProvider;
        let uri = Url::parse("acme://letsencrypt.org/v99").unwrap();
        assert!(provider.resolve(&uri).is_err());
    }

    #[test]
    fn test_other_hosts_not_accepted() {
        let provider = LetsEncryptProvider;
        assert!(!provider.accepts(&Url::parse("acme://zerossl.com").unwrap()));
        assert!(!provider.accepts(&Url::parse("https://letsencrypt.org").unwrap()));
    }
}
