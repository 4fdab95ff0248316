/// JSON Web Key (RFC 7517) representation and RFC 7638 thumbprints
use crate::error::{AcmeError, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

/// Public JSON Web Key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    /// Key type ("RSA", "EC", "OKP")
    pub kty: String,

    /// Remaining key parameters; serde_json's map keeps them sorted
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl Jwk {
    /// Create an RSA public key
    pub fn rsa(n: impl Into<String>, e: impl Into<String>) -> Self {
        let mut params = Map::new();
        params.insert("n".to_string(), Value::String(n.into()));
        params.insert("e".to_string(), Value::String(e.into()));
        Self {
            kty: "RSA".to_string(),
            params,
        }
    }

    /// Create an EC public key on the named curve
    pub fn ec(crv: impl Into<String>, x: impl Into<String>, y: impl Into<String>) -> Self {
        let mut params = Map::new();
        params.insert("crv".to_string(), Value::String(crv.into()));
        params.insert("x".to_string(), Value::String(x.into()));
        params.insert("y".to_string(), Value::String(y.into()));
        Self {
            kty: "EC".to_string(),
            params,
        }
    }

    /// Create an Ed25519 public key
    pub fn ed25519(x: impl Into<String>) -> Self {
        let mut params = Map::new();
        params.insert("crv".to_string(), Value::String("Ed25519".to_string()));
        params.insert("x".to_string(), Value::String(x.into()));
        Self {
            kty: "OKP".to_string(),
            params,
        }
    }

    fn param(&self, name: &str) -> Result<&str> {
        self.params
            .get(name)
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AcmeError::invalid_input(format!("Missing {} '{}' parameter", self.kty, name))
            })
    }

    /// Canonical JSON of the required members, sorted lexicographically,
    /// without whitespace (RFC 7638 §3)
    pub fn canonical(&self) -> Result<String> {
        let required = match self.kty.as_str() {
            "RSA" => json!({
                "e": self.param("e")?,
                "kty": "RSA",
                "n": self.param("n")?,
            }),
            "EC" => json!({
                "crv": self.param("crv")?,
                "kty": "EC",
                "x": self.param("x")?,
                "y": self.param("y")?,
            }),
            "OKP" => json!({
                "crv": self.param("crv")?,
                "kty": "OKP",
                "x": self.param("x")?,
            }),
            other => {
                return Err(AcmeError::invalid_input(format!(
                    "Unsupported key type: {}",
                    other
                )));
            }
        };
        Ok(required.to_string())
    }

    /// SHA-256 thumbprint of the canonical form, base64url without padding
    pub fn thumbprint_sha256(&self) -> Result<String> {
        let digest = Sha256::digest(self.canonical()?.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(digest))
    }

    /// Convert to a JSON value for embedding in a JWS header
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 7638 §3.1 example key
    const RFC7638_N: &str = "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw";

    #[test]
    fn test_rfc7638_thumbprint_vector() {
        let jwk = Jwk::rsa(RFC7638_N, "AQAB");
        assert_eq!(
            jwk.thumbprint_sha256().unwrap(),
            "NzbLsXh8uDCcd-6MNwXF4W_7noWXFZAfHkxZsRGC9Xs"
        );
    }

    #[test]
    fn test_canonical_is_field_order_independent() {
        // Built with n before e; canonical form must still sort e first.
        let jwk = Jwk::rsa(RFC7638_N, "AQAB");
        let canonical = jwk.canonical().unwrap();
        assert!(canonical.starts_with(r#"{"e":"AQAB","kty":"RSA","n":""#));
        assert!(!canonical.contains(' '));
    }

    #[test]
    fn test_canonical_ec() {
        let jwk = Jwk::ec(
            "P-256",
            "WKn-ZIGevcwGIyyrzFoZNBdaq9_TsqzGl96oc0CWuis",
            "y8lrnvOohSs2gksT69r56Fq3MZ_yCjL8MyCvD94PoWU",
        );
        let canonical = jwk.canonical().unwrap();
        assert!(canonical.starts_with(r#"{"crv":"P-256","kty":"EC","x":""#));
    }

    #[test]
    fn test_thumbprint_is_base64url() {
        let jwk = Jwk::ed25519("11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo");
        let thumbprint = jwk.thumbprint_sha256().unwrap();
        assert!(!thumbprint.contains('='));
        assert!(!thumbprint.contains('+'));
        assert!(!thumbprint.contains('/'));
    }

    #[test]
    fn test_unknown_kty_rejected() {
        let jwk = Jwk {
            kty: "oct".to_string(),
            params: Map::new(),
        };
        assert!(jwk.thumbprint_sha256().is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let jwk = Jwk::ec("P-256", "xxx", "yyy");
        let json = serde_json::to_string(&jwk).unwrap();
        let parsed: Jwk = serde_json::from_str(&json).unwrap();
        assert_eq!(jwk, parsed);
    }
}
