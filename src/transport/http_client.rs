/// HTTP client wrapping reqwest for ACME exchanges
use crate::error::{AcmeError, Result};
use std::time::Duration;

/// Media type of signed ACME request bodies
pub const JOSE_CONTENT_TYPE: &str = "application/jose+json";

/// HTTPS settings for a session
#[derive(Debug, Clone)]
pub struct TransportSettings {
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Per-request read timeout
    pub read_timeout: Duration,
    /// Proxy URL, if any
    pub proxy: Option<String>,
    /// User agent sent with every request
    pub user_agent: String,
    /// `Accept-Language` tag propagated to every request
    pub accept_language: Option<String>,
    /// Additional trusted root certificates (PEM), for test CAs like Pebble
    pub pinned_roots: Vec<Vec<u8>>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            proxy: None,
            user_agent: concat!("acmekit/", env!("CARGO_PKG_VERSION")).to_string(),
            accept_language: None,
            pinned_roots: Vec::new(),
        }
    }
}

/// HTTP response with status, headers and raw body
///
/// Header names are lower-cased; repeated headers (`Link`) keep every value.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Response headers as (lowercase name, value) pairs
    pub headers: Vec<(String, String)>,
    /// Raw response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// First value of the given header, if present
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All values of the given header
    pub fn header_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .filter(move |(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Essence of the `Content-Type` header (parameters stripped)
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim())
    }

    /// Parse the body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| AcmeError::protocol(format!("JSON parse error: {}", e)))
    }

    /// Check if this is a success status (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTPS transport shared by all exchanges of a session
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    accept_language: Option<String>,
}

impl HttpTransport {
    /// Build a transport from session settings
    pub fn new(settings: &TransportSettings) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.read_timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(&settings.user_agent);

        if let Some(proxy) = &settings.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| AcmeError::configuration(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        for root in &settings.pinned_roots {
            let cert = reqwest::Certificate::from_pem(root)
                .map_err(|e| AcmeError::configuration(format!("Invalid pinned root: {}", e)))?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder
            .build()
            .map_err(|e| AcmeError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            accept_language: settings.accept_language.clone(),
        })
    }

    /// Execute a GET request (directory fetch only)
    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.execute(self.client.get(url)).await
    }

    /// Execute a HEAD request (nonce priming)
    pub async fn head(&self, url: &str) -> Result<HttpResponse> {
        self.execute(self.client.head(url)).await
    }

    /// POST a serialized JWS with media type `application/jose+json`
    pub async fn post(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse> {
        let request = self
            .client
            .post(url)
            .header("Content-Type", JOSE_CONTENT_TYPE)
            .body(body);
        self.execute(request).await
    }

    async fn execute(&self, mut request: reqwest::RequestBuilder) -> Result<HttpResponse> {
        if let Some(language) = &self.accept_language {
            request = request.header("Accept-Language", language);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AcmeError::network(format!("Request failed: {}", e)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_ascii_lowercase(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| AcmeError::network(format!("Failed to read body: {}", e)))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with_headers(headers: Vec<(&str, &str)>) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: Vec::new(),
        }
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let response = response_with_headers(vec![("replay-nonce", "abc")]);
        assert_eq!(response.header("Replay-Nonce"), Some("abc"));
    }

    #[test]
    fn test_header_all_keeps_repeats() {
        let response = response_with_headers(vec![
            ("link", "<https://a>;rel=\"index\""),
            ("link", "<https://b>;rel=\"alternate\""),
        ]);
        assert_eq!(response.header_all("Link").count(), 2);
    }

    #[test]
    fn test_content_type_strips_parameters() {
        let response =
            response_with_headers(vec![("content-type", "application/json; charset=utf-8")]);
        assert_eq!(response.content_type(), Some("application/json"));
    }

    #[test]
    fn test_transport_creation() {
        let transport = HttpTransport::new(&TransportSettings::default());
        assert!(transport.is_ok());
    }

    #[tokio::test]
    async fn test_head_and_get() {
        let mut server = mockito::Server::new_async().await;
        let head = server
            .mock("HEAD", "/nonce")
            .with_status(200)
            .with_header("Replay-Nonce", "nonce-1")
            .create_async()
            .await;
        let get = server
            .mock("GET", "/dir")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(&TransportSettings::default()).unwrap();
        let response = transport.head(&format!("{}/nonce", server.url())).await.unwrap();
        assert_eq!(response.header("replay-nonce"), Some("nonce-1"));

        let response = transport.get(&format!("{}/dir", server.url())).await.unwrap();
        assert!(response.is_success());
        assert_eq!(response.content_type(), Some("application/json"));

        head.assert_async().await;
        get.assert_async().await;
    }

    #[tokio::test]
    async fn test_accept_language_propagated() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/dir")
            .match_header("accept-language", "de")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let settings = TransportSettings {
            accept_language: Some("de".to_string()),
            ..TransportSettings::default()
        };
        let transport = HttpTransport::new(&settings).unwrap();
        transport.get(&format!("{}/dir", server.url())).await.unwrap();
        mock.assert_async().await;
    }
}
