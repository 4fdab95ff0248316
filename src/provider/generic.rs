/// Generic provider for plain directory URLs
use crate::error::Result;
use crate::provider::AcmeProvider;
use async_trait::async_trait;
use url::Url;

/// Accepts any `http`/`https` URI and uses it verbatim as the directory URL
pub struct GenericProvider;

#[async_trait]
impl AcmeProvider for GenericProvider {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn accepts(&self, uri: &Url) -> bool {
        matches!(uri.scheme(), "http" | "https")
    }

    fn resolve(&self, uri: &Url) -> Result<String> {
        Ok(uri.as_str().to_string())
    }
}
