/// Key authorizations and their per-challenge derivations
use crate::crypto::AccountKey;
use crate::error::Result;
use crate::protocol::Jwk;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use data_encoding::BASE32_NOPAD;
use sha2::{Digest, Sha256};

/// Critical X.509 extension OID carrying the tls-alpn-01 digest (RFC 8737)
pub const ACME_TLS_ALPN_OID: &str = "1.3.6.1.5.5.7.1.31";

/// Well-known path prefix served for http-01 (RFC 8555 §8.3)
pub const HTTP01_PATH_PREFIX: &str = "/.well-known/acme-challenge/";

/// Proof of account-key possession for a challenge token
///
/// The canonical string `token.thumbprint(jwk)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAuthorization(String);

impl KeyAuthorization {
    /// Compute the key authorization for a token and public key
    pub fn new(token: &str, jwk: &Jwk) -> Result<Self> {
        let thumbprint = jwk.thumbprint_sha256()?;
        Ok(Self(format!("{}.{}", token, thumbprint)))
    }

    /// Compute the key authorization for a token and account key
    pub fn for_key(token: &str, key: &dyn AccountKey) -> Result<Self> {
        Self::new(token, &key.public_jwk())
    }

    /// The canonical key-authorization string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// http-01: body served verbatim at the well-known challenge path
    pub fn http01_body(&self) -> &str {
        &self.0
    }

    /// dns-01: value of the `_acme-challenge` TXT record
    pub fn dns01_digest(&self) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(self.0.as_bytes()))
    }

    /// tls-alpn-01: digest placed in the acmeIdentifier extension
    pub fn tls_alpn01_digest(&self) -> [u8; 32] {
        Sha256::digest(self.0.as_bytes()).into()
    }
}

impl std::fmt::Display for KeyAuthorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// http-01: full request path for a token
pub fn http01_path(token: &str) -> String {
    format!("{}{}", HTTP01_PATH_PREFIX, token)
}

/// dns-01: owner name of the TXT record for a domain
pub fn dns01_record_name(domain: &str) -> String {
    format!("_acme-challenge.{}", domain.trim_start_matches("*."))
}

/// dns-account-01: account-scoped label, the first 10 characters of the
/// lowercase base32 SHA-256 of the account URL
pub fn dns_account01_label(account_url: &str) -> String {
    let digest = Sha256::digest(account_url.as_bytes());
    BASE32_NOPAD.encode(&digest).to_ascii_lowercase()[..10].to_string()
}

/// dns-account-01: owner name of the TXT record for a domain
pub fn dns_account01_record_name(account_url: &str, domain: &str) -> String {
    format!(
        "_{}._acme-challenge.{}",
        dns_account01_label(account_url),
        domain.trim_start_matches("*.")
    )
}

/// email-reply-00: join the token part from the challenge email subject
/// (part 1) with the token part from the challenge object (part 2)
pub fn email_reply_full_token(part1: &str, part2: &str) -> String {
    format!("{}{}", part1, part2)
}
