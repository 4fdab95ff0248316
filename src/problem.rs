/// RFC 7807 problem documents and their mapping to error kinds
use crate::error::AcmeError;
use crate::types::Identifier;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Media type of ACME error responses
pub const CONTENT_TYPE: &str = "application/problem+json";

/// Namespace of ACME error type URNs
pub const ACME_ERROR_PREFIX: &str = "urn:ietf:params:acme:error:";

fn default_problem_type() -> String {
    "about:blank".to_string()
}

/// A structured problem document returned by the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Problem {
    /// Error type URI; ACME errors live under `urn:ietf:params:acme:error:`
    #[serde(rename = "type", default = "default_problem_type")]
    pub problem_type: String,

    /// Short human-readable summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Human-readable explanation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// URI identifying the specific occurrence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,

    /// HTTP status code mirrored into the body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Identifier this problem relates to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Identifier>,

    /// Per-identifier sub-problems
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subproblems: Option<Vec<Problem>>,
}

impl Problem {
    /// Parse a problem document from response bytes
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// The error name within the ACME namespace, if this is an ACME error
    ///
    /// `urn:ietf:params:acme:error:badNonce` yields `Some("badNonce")`.
    pub fn acme_type(&self) -> Option<&str> {
        self.problem_type.strip_prefix(ACME_ERROR_PREFIX)
    }

    /// True for `urn:ietf:params:acme:error:badNonce`
    pub fn is_bad_nonce(&self) -> bool {
        self.acme_type() == Some("badNonce")
    }

    /// Sub-problems, empty when the server sent none
    pub fn subproblems(&self) -> &[Problem] {
        self.subproblems.as_deref().unwrap_or_default()
    }

    /// Map this problem to the error kind surfaced to callers
    ///
    /// `tos_url` is the `Link: rel="terms-of-service"` target,
    /// `rate_limit_links` the `rel="rate-limit"` targets, and `retry_after`
    /// the parsed `Retry-After` header from the same response.
    pub fn into_error(
        self,
        tos_url: Option<String>,
        rate_limit_links: Vec<String>,
        retry_after: Option<Duration>,
    ) -> AcmeError {
        match self.acme_type() {
            Some("unauthorized") => AcmeError::Unauthorized(self),
            Some("accountDoesNotExist") => AcmeError::AccountNotFound(self),
            Some("userActionRequired") => AcmeError::UserActionRequired {
                tos_url,
                problem: self,
            },
            Some("rateLimited") => AcmeError::RateLimited {
                retry_after,
                links: rate_limit_links,
                problem: self,
            },
            _ => AcmeError::Server(self),
        }
    }
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({})", detail, self.problem_type),
            None => write!(f, "{}", self.problem_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_parsing() {
        let json = r#"{
            "type": "urn:ietf:params:acme:error:malformed",
            "detail": "Some of the identifiers requested were rejected",
            "status": 400,
            "subproblems": [
                {
                    "type": "urn:ietf:params:acme:error:malformed",
                    "detail": "Invalid underscore in DNS name \"_example.org\"",
                    "identifier": {"type": "dns", "value": "_example.org"}
                }
            ]
        }"#;

        let problem = Problem::from_slice(json.as_bytes()).expect("Failed to parse problem");
        assert_eq!(problem.acme_type(), Some("malformed"));
        assert_eq!(problem.status, Some(400));
        assert_eq!(problem.subproblems().len(), 1);
        let sub = &problem.subproblems()[0];
        assert_eq!(
            sub.identifier.as_ref().unwrap().value,
            "_example.org".to_string()
        );
    }

    #[test]
    fn test_problem_type_defaults_to_about_blank() {
        let problem = Problem::from_slice(br#"{"detail": "it broke"}"#).unwrap();
        assert_eq!(problem.problem_type, "about:blank");
        assert!(problem.acme_type().is_none());
    }

    #[test]
    fn test_problem_round_trip() {
        let json = r#"{
            "type": "urn:ietf:params:acme:error:rateLimited",
            "title": "Too many requests",
            "detail": "Slow down",
            "instance": "https://ca.example/doc/rate",
            "status": 429
        }"#;
        let problem = Problem::from_slice(json.as_bytes()).unwrap();
        let reserialized = serde_json::to_vec(&problem).unwrap();
        let again = Problem::from_slice(&reserialized).unwrap();
        assert_eq!(problem, again);
    }

    #[test]
    fn test_bad_nonce_detection() {
        let problem = Problem::from_slice(
            br#"{"type": "urn:ietf:params:acme:error:badNonce", "detail": "stale"}"#,
        )
        .unwrap();
        assert!(problem.is_bad_nonce());
    }

    #[test]
    fn test_error_mapping() {
        let unauthorized = Problem::from_slice(
            br#"{"type": "urn:ietf:params:acme:error:unauthorized", "detail": "no"}"#,
        )
        .unwrap();
        assert!(matches!(
            unauthorized.into_error(None, Vec::new(), None),
            AcmeError::Unauthorized(_)
        ));

        let missing = Problem::from_slice(
            br#"{"type": "urn:ietf:params:acme:error:accountDoesNotExist"}"#,
        )
        .unwrap();
        assert!(matches!(
            missing.into_error(None, Vec::new(), None),
            AcmeError::AccountNotFound(_)
        ));

        let tos = Problem::from_slice(
            br#"{"type": "urn:ietf:params:acme:error:userActionRequired"}"#,
        )
        .unwrap();
        match tos.into_error(Some("https://ca.example/tos".to_string()), Vec::new(), None) {
            AcmeError::UserActionRequired { tos_url, .. } => {
                assert_eq!(tos_url.as_deref(), Some("https://ca.example/tos"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let limited = Problem::from_slice(
            br#"{"type": "urn:ietf:params:acme:error:rateLimited"}"#,
        )
        .unwrap();
        match limited.into_error(
            None,
            vec!["https://ca.example/doc".to_string()],
            Some(Duration::from_secs(30)),
        ) {
            AcmeError::RateLimited {
                retry_after, links, ..
            } => {
                assert_eq!(retry_after, Some(Duration::from_secs(30)));
                assert_eq!(links.len(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }

        let generic = Problem::from_slice(
            br#"{"type": "urn:ietf:params:acme:error:caa", "detail": "CAA forbids"}"#,
        )
        .unwrap();
        assert!(matches!(
            generic.into_error(None, Vec::new(), None),
            AcmeError::Server(_)
        ));
    }
}
