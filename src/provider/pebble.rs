/// Provider for the Pebble test server
use crate::error::{AcmeError, Result};
use crate::provider::AcmeProvider;
use crate::transport::{HttpTransport, TransportSettings};
use async_trait::async_trait;
use url::Url;

const DEFAULT_HOST: &str = "localhost:14000";

/// Resolves `acme://pebble[/<host:port>]` against a local Pebble instance
///
/// Pebble serves its directory over TLS with a self-signed root; the root
/// is supplied by the caller as PEM bytes, never bundled.
pub struct PebbleProvider {
    root_pem: Vec<u8>,
}

impl PebbleProvider {
    /// Create a provider trusting the given root certificate (PEM)
    pub fn new(root_pem: impl Into<Vec<u8>>) -> Self {
        Self {
            root_pem: root_pem.into(),
        }
    }
}

#[async_trait]
impl AcmeProvider for PebbleProvider {
    fn name(&self) -> &'static str {
        "pebble"
    }

    fn accepts(&self, uri: &Url) -> bool {
        uri.scheme() == "acme" && uri.host_str() == Some("pebble")
    }

    fn resolve(&self, uri: &Url) -> Result<String> {
        let host = match uri.path() {
            "" | "/" => DEFAULT_HOST,
            other => other.trim_start_matches('/'),
        };
        if host.is_empty() || host.contains('/') {
            return Err(AcmeError::configuration(format!(
                "Invalid Pebble host: {}",
                host
            )));
        }
        Ok(format!("https://{}/dir", host))
    }

    fn transport(&self, settings: &TransportSettings) -> Result<Option<HttpTransport>> {
        let mut settings = settings.clone();
        settings.pinned_roots.push(self.root_pem.clone());
        HttpTransport::new(&settings).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Self-signed test root, only used to exercise transport construction.
    const TEST_ROOT: &str = "-----BEGIN CERTIFICATE-----
MIIBhTCCASugAwIBAgIQIRi6zePL6mKjOipn+dNuaTAKBggqhkjOPQQDAjASMRAw
DgYDVQQKEwdBY21lIENvMB4XDTE3MTAyMDE5NDMwNloXDTE4MTAyMDE5NDMwNlow
EjEQMA4GA1UEChMHQWNtZSBDbzBZMBMGByqGSM49AgEGCCqGSM49AwEHA0IABD0d
7VNhbWvZLWPuj/RtHFjvtJBEwOkhbN/BnnE8rnZR8+sbwnc/KhCk3FhnpHZnQz7B
5aETbbIgmuvewdjvSBSjYzBhMA4GA1UdDwEB/wQEAwICpDATBgNVHSUEDDAKBggr
BgEFBQcDATAPBgNVHRMBAf8EBTADAQH/MCkGA1UdEQQiMCCCDmxvY2FsaG9zdDo1
NDUzgg4xMjcuMC4wLjE6NTQ1MzAKBggqhkjOPQQDAgNIADBFAiEA2zpJEPQyz6/l
Wf86aX6PepsntZv2GYlA5UpabfT2EZICICpJ5h/iI+i341gBmLiAFQOyTDT+/wQc
6MF9+Yw1Yy0t
-----END CERTIFICATE-----
";

    #[test]
    fn test_default_and_custom_hosts() {
        let provider = PebbleProvider::new(TEST_ROOT.as_bytes());

        let uri = Url::parse("acme://pebble").unwrap();
        assert!(provider.accepts(&uri));
        assert_eq!(provider.resolve(&uri).unwrap(), "https://localhost:14000/dir");

        let uri = Url::parse("acme://pebble/pebble.internal:14001").unwrap();
        assert_eq!(
            provider.resolve(&uri).unwrap(),
            "https://pebble.internal:14001/dir"
        );
    }

    #[test]
    fn test_transport_pins_the_caller_root() {
        let provider = PebbleProvider::new(TEST_ROOT.as_bytes());
        let transport = provider.transport(&TransportSettings::default()).unwrap();
        assert!(transport.is_some());
    }

    #[test]
    fn test_invalid_root_is_a_configuration_error() {
        let provider = PebbleProvider::new(&b"not a certificate"[..]);
        assert!(provider.transport(&TransportSettings::default()).is_err());
    }
}
