/// Flattened JWS envelopes for signed ACME requests
use crate::crypto::AccountKey;
use crate::error::Result;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How the signer identifies itself in the protected header
///
/// Exactly one of `jwk`/`kid` appears: the embedded public key for account
/// creation, key change and revocation by certificate key; the account URL
/// for everything else.
#[derive(Debug, Clone, Copy)]
pub enum JwsIdentity<'a> {
    /// Embed the signing key's public JWK
    KeyJwk,
    /// Reference the account by its URL
    AccountUrl(&'a str),
}

/// A signed request in the flattened JSON serialization (RFC 7515 §7.2.2)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedRequest {
    /// Base64url of the protected header
    pub protected: String,
    /// Base64url of the payload; empty for POST-as-GET
    pub payload: String,
    /// Base64url of the signature
    pub signature: String,
}

impl SignedRequest {
    /// Serialize for the request body
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Convert to a JSON value (outer payload of a key-change request)
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Sign a payload for the given URL
///
/// `nonce` is `None` only for the inner JWS of a key-change request. An
/// empty `payload` produces the empty-string payload of a POST-as-GET.
pub fn sign(
    key: &dyn AccountKey,
    identity: JwsIdentity<'_>,
    nonce: Option<&str>,
    url: &str,
    payload: &[u8],
) -> Result<SignedRequest> {
    let mut header = Map::new();
    header.insert(
        "alg".to_string(),
        Value::String(key.algorithm().as_str().to_string()),
    );
    match identity {
        JwsIdentity::KeyJwk => {
            header.insert("jwk".to_string(), key.public_jwk().to_value());
        }
        JwsIdentity::AccountUrl(kid) => {
            header.insert("kid".to_string(), Value::String(kid.to_string()));
        }
    }
    if let Some(nonce) = nonce {
        header.insert("nonce".to_string(), Value::String(nonce.to_string()));
    }
    header.insert("url".to_string(), Value::String(url.to_string()));

    let protected = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&Value::Object(header))?);
    let payload = if payload.is_empty() {
        String::new()
    } else {
        URL_SAFE_NO_PAD.encode(payload)
    };

    let signing_input = format!("{}.{}", protected, payload);
    let signature = URL_SAFE_NO_PAD.encode(key.sign(signing_input.as_bytes())?);

    Ok(SignedRequest {
        protected,
        payload,
        signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{EcdsaAccountKey, EcdsaCurve};
    use ring::signature::{ECDSA_P256_SHA256_FIXED, UnparsedPublicKey};

    fn decode_json(b64: &str) -> Value {
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(b64).unwrap()).unwrap()
    }

    #[test]
    fn test_jwk_header_shape() {
        let key = EcdsaAccountKey::generate(EcdsaCurve::P256).unwrap();
        let jws = sign(
            &key,
            JwsIdentity::KeyJwk,
            Some("nonce-1"),
            "https://ca.example/acme/new-account",
            br#"{"termsOfServiceAgreed":true}"#,
        )
        .unwrap();

        let header = decode_json(&jws.protected);
        assert_eq!(header["alg"], "ES256");
        assert_eq!(header["nonce"], "nonce-1");
        assert_eq!(header["url"], "https://ca.example/acme/new-account");
        assert!(header.get("jwk").is_some());
        assert!(header.get("kid").is_none());
    }

    #[test]
    fn test_kid_header_shape() {
        let key = EcdsaAccountKey::generate(EcdsaCurve::P256).unwrap();
        let jws = sign(
            &key,
            JwsIdentity::AccountUrl("https://ca.example/acme/acct/1"),
            Some("nonce-2"),
            "https://ca.example/acme/new-order",
            br#"{}"#,
        )
        .unwrap();

        let header = decode_json(&jws.protected);
        assert_eq!(header["kid"], "https://ca.example/acme/acct/1");
        assert!(header.get("jwk").is_none());
    }

    #[test]
    fn test_post_as_get_payload_is_empty_string() {
        let key = EcdsaAccountKey::generate(EcdsaCurve::P256).unwrap();
        let jws = sign(
            &key,
            JwsIdentity::AccountUrl("https://ca.example/acme/acct/1"),
            Some("n"),
            "https://ca.example/acme/order/1",
            b"",
        )
        .unwrap();
        assert_eq!(jws.payload, "");
    }

    #[test]
    fn test_inner_jws_omits_nonce() {
        let key = EcdsaAccountKey::generate(EcdsaCurve::P256).unwrap();
        let jws = sign(
            &key,
            JwsIdentity::KeyJwk,
            None,
            "https://ca.example/acme/key-change",
            br#"{"account":"x"}"#,
        )
        .unwrap();
        let header = decode_json(&jws.protected);
        assert!(header.get("nonce").is_none());
    }

    #[test]
    fn test_signature_verifies_over_signing_input() {
        let key = EcdsaAccountKey::generate(EcdsaCurve::P256).unwrap();
        let jwk = key.public_jwk();
        let jws = sign(
            &key,
            JwsIdentity::KeyJwk,
            Some("n"),
            "https://ca.example/",
            b"payload",
        )
        .unwrap();

        let x = URL_SAFE_NO_PAD
            .decode(jwk.params.get("x").unwrap().as_str().unwrap())
            .unwrap();
        let y = URL_SAFE_NO_PAD
            .decode(jwk.params.get("y").unwrap().as_str().unwrap())
            .unwrap();
        let mut point = vec![0x04];
        point.extend(x);
        point.extend(y);

        let signing_input = format!("{}.{}", jws.protected, jws.payload);
        let signature = URL_SAFE_NO_PAD.decode(&jws.signature).unwrap();
        let public = UnparsedPublicKey::new(&ECDSA_P256_SHA256_FIXED, point);
        assert!(public.verify(signing_input.as_bytes(), &signature).is_ok());
    }

    #[test]
    fn test_all_parts_are_base64url() {
        let key = EcdsaAccountKey::generate(EcdsaCurve::P256).unwrap();
        let jws = sign(&key, JwsIdentity::KeyJwk, Some("n"), "https://x/", b"{}").unwrap();
        for part in [&jws.protected, &jws.payload, &jws.signature] {
            assert!(!part.contains(['+', '/', '=']));
        }
    }
}
