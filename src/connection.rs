/// One signed POST/POST-as-GET exchange, with badNonce recovery
use crate::crypto::AccountKey;
use crate::error::{AcmeError, Result};
use crate::problem::{self, Problem};
use crate::protocol::jws::{self, JwsIdentity};
use crate::protocol::{ResourceKind, nonce::REPLAY_NONCE};
use crate::session::Session;
use crate::transport::HttpResponse;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

/// Internal retry budget for `badNonce` rejections
pub(crate) const MAX_BAD_NONCE_RETRIES: u32 = 3;

const JSON_CONTENT_TYPE: &str = "application/json";
const PEM_CHAIN_CONTENT_TYPE: &str = "application/pem-certificate-chain";

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<([^>]+)>\s*;[^,<]*rel="([^"]+)""#).expect("link regex"));

/// A typed link relation from a `Link` header
#[derive(Debug, Clone)]
pub(crate) struct Link {
    pub rel: String,
    pub url: String,
}

/// Body of a successful ACME response
#[derive(Debug, Clone)]
pub(crate) enum ResponseBody {
    /// `application/json`
    Json(Value),
    /// `application/pem-certificate-chain`, split into DER blobs, leaf first
    Certificates(Vec<Vec<u8>>),
    /// No content
    Empty,
}

/// A successful exchange: status, interesting headers, parsed body
#[derive(Debug, Clone)]
pub(crate) struct AcmeResponse {
    pub status: u16,
    pub location: Option<String>,
    pub links: Vec<Link>,
    pub retry_after: Option<Duration>,
    pub body: ResponseBody,
}

impl AcmeResponse {
    /// First link with the given relation
    pub fn link(&self, rel: &str) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.rel == rel)
            .map(|l| l.url.as_str())
    }

    /// All links with the given relation
    pub fn links(&self, rel: &str) -> Vec<String> {
        self.links
            .iter()
            .filter(|l| l.rel == rel)
            .map(|l| l.url.clone())
            .collect()
    }

    /// The `Location` header, required on creation responses
    pub fn require_location(&self) -> Result<String> {
        self.location
            .clone()
            .ok_or_else(|| AcmeError::protocol("Missing Location header"))
    }

    /// The JSON body, or a protocol error for any other body kind
    pub fn require_json(&self) -> Result<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Ok(value),
            _ => Err(AcmeError::protocol("Expected a JSON response body")),
        }
    }
}

/// Orchestrates signed exchanges for one session
pub(crate) struct Connection<'a> {
    session: &'a Session,
}

impl<'a> Connection<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// POST-as-GET: signed request with an empty payload
    pub async fn post_as_get(
        &self,
        url: &str,
        key: &dyn AccountKey,
        identity: JwsIdentity<'_>,
    ) -> Result<AcmeResponse> {
        self.send(url, None, key, identity).await
    }

    /// Send a signed request, retrying internally on `badNonce`
    ///
    /// Every response replenishes the nonce pool from `Replay-Nonce`,
    /// including error responses. Problem documents are parsed and attached
    /// to the returned error; only `badNonce` is handled locally.
    pub async fn send(
        &self,
        url: &str,
        payload: Option<&Value>,
        key: &dyn AccountKey,
        identity: JwsIdentity<'_>,
    ) -> Result<AcmeResponse> {
        let payload_bytes = match payload {
            Some(value) => serde_json::to_vec(value)?,
            None => Vec::new(),
        };
        let new_nonce_url = self.session.resource_url(ResourceKind::NewNonce).await?;

        let mut attempt = 0u32;
        loop {
            let nonce = self
                .session
                .nonce_pool()
                .take(self.session.transport(), &new_nonce_url)
                .await?;
            let jws = jws::sign(key, identity, Some(&nonce), url, &payload_bytes)?;

            debug!(url, attempt, "Sending signed request");
            let response = self.session.transport().post(url, jws.to_bytes()?).await?;

            if let Some(fresh) = response.header(REPLAY_NONCE) {
                self.session.nonce_pool().store(fresh).await;
            }

            let links = parse_links(&response);
            let retry_after = parse_retry_after(response.header("retry-after"));
            let location = response.header("location").map(String::from);

            if response.is_success() {
                let body = parse_success_body(&response)?;
                return Ok(AcmeResponse {
                    status: response.status,
                    location,
                    links,
                    retry_after,
                    body,
                });
            }

            if response.content_type() != Some(problem::CONTENT_TYPE) {
                return Err(AcmeError::protocol(format!(
                    "HTTP {} without problem document",
                    response.status
                )));
            }

            let problem = Problem::from_slice(&response.body)
                .map_err(|e| AcmeError::protocol(format!("Malformed problem document: {}", e)))?;

            if problem.is_bad_nonce() {
                if attempt < MAX_BAD_NONCE_RETRIES {
                    attempt += 1;
                    debug!(url, attempt, "Server rejected nonce, re-signing with a fresh one");
                    continue;
                }
                return Err(AcmeError::RetriableNonce {
                    attempts: attempt,
                    problem,
                });
            }

            let tos_url = links
                .iter()
                .find(|l| l.rel == "terms-of-service")
                .map(|l| l.url.clone());
            let rate_limit_links = links
                .iter()
                .filter(|l| l.rel == "rate-limit")
                .map(|l| l.url.clone())
                .collect();
            return Err(problem.into_error(tos_url, rate_limit_links, retry_after));
        }
    }
}

fn parse_success_body(response: &HttpResponse) -> Result<ResponseBody> {
    match response.content_type() {
        Some(problem::CONTENT_TYPE) => Err(AcmeError::protocol(
            "Problem document on a success response",
        )),
        _ if response.body.is_empty() => Ok(ResponseBody::Empty),
        Some(JSON_CONTENT_TYPE) => Ok(ResponseBody::Json(response.json()?)),
        Some(PEM_CHAIN_CONTENT_TYPE) => {
            Ok(ResponseBody::Certificates(split_pem_chain(&response.body)?))
        }
        Some(other) => Err(AcmeError::protocol(format!(
            "Unexpected content type: {}",
            other
        ))),
        None => Err(AcmeError::protocol("Response body without content type")),
    }
}

/// Split a PEM certificate chain into DER blobs, preserving server order
pub(crate) fn split_pem_chain(body: &[u8]) -> Result<Vec<Vec<u8>>> {
    let blocks = pem::parse_many(body).map_err(|e| AcmeError::pem(e.to_string()))?;
    let certificates: Vec<Vec<u8>> = blocks
        .iter()
        .filter(|block| block.tag() == "CERTIFICATE")
        .map(|block| block.contents().to_vec())
        .collect();
    if certificates.is_empty() {
        return Err(AcmeError::protocol("Certificate chain contains no certificates"));
    }
    Ok(certificates)
}

fn parse_links(response: &HttpResponse) -> Vec<Link> {
    let mut links = Vec::new();
    for header in response.header_all("link") {
        for capture in LINK_RE.captures_iter(header) {
            links.push(Link {
                url: capture[1].to_string(),
                rel: capture[2].to_string(),
            });
        }
    }
    links
}

/// Parse a `Retry-After` header: delta-seconds or HTTP-date
pub(crate) fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    let value = value?.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    static PARSER: jiff::fmt::rfc2822::DateTimeParser = jiff::fmt::rfc2822::DateTimeParser::new();
    let zoned = PARSER.parse_zoned(value).ok()?;
    let seconds = zoned.timestamp().as_second() - jiff::Timestamp::now().as_second();
    Some(Duration::from_secs(seconds.max(0) as u64))
}
