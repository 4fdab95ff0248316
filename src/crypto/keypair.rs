/// Account key pairs for JWS signing
use crate::error::{AcmeError, Result};
use crate::protocol::Jwk;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ring::rand::SystemRandom;
use ring::signature::{
    ECDSA_P256_SHA256_FIXED_SIGNING, ECDSA_P384_SHA384_FIXED_SIGNING, EcdsaKeyPair,
    Ed25519KeyPair, KeyPair as _, RSA_PKCS1_SHA256, RsaKeyPair,
};

/// JWS signature algorithm identifiers (RFC 7518)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwsAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256
    Rs256,
    /// ECDSA P-256 with SHA-256
    Es256,
    /// ECDSA P-384 with SHA-384
    Es384,
    /// Ed25519
    EdDsa,
}

impl JwsAlgorithm {
    /// The `alg` header value
    pub fn as_str(&self) -> &'static str {
        match self {
            JwsAlgorithm::Rs256 => "RS256",
            JwsAlgorithm::Es256 => "ES256",
            JwsAlgorithm::Es384 => "ES384",
            JwsAlgorithm::EdDsa => "EdDSA",
        }
    }
}

impl std::fmt::Display for JwsAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A key pair able to sign ACME requests
///
/// This is the seam for caller-supplied keys; the ring-backed types below
/// cover the common algorithms.
pub trait AccountKey: Send + Sync {
    /// The JWS algorithm this key signs with
    fn algorithm(&self) -> JwsAlgorithm;

    /// Public key as a JWK
    fn public_jwk(&self) -> Jwk;

    /// Sign the message, returning the raw JWS signature bytes
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;
}

/// Supported ECDSA curves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcdsaCurve {
    /// NIST P-256
    P256,
    /// NIST P-384
    P384,
}

impl EcdsaCurve {
    fn signing_alg(&self) -> &'static ring::signature::EcdsaSigningAlgorithm {
        match self {
            EcdsaCurve::P256 => &ECDSA_P256_SHA256_FIXED_SIGNING,
            EcdsaCurve::P384 => &ECDSA_P384_SHA384_FIXED_SIGNING,
        }
    }

    fn crv(&self) -> &'static str {
        match self {
            EcdsaCurve::P256 => "P-256",
            EcdsaCurve::P384 => "P-384",
        }
    }

    fn coordinate_len(&self) -> usize {
        match self {
            EcdsaCurve::P256 => 32,
            EcdsaCurve::P384 => 48,
        }
    }
}

/// ECDSA account key (ES256/ES384)
pub struct EcdsaAccountKey {
    key_pair: EcdsaKeyPair,
    curve: EcdsaCurve,
    pkcs8: Vec<u8>,
    rng: SystemRandom,
}

impl EcdsaAccountKey {
    /// Generate a fresh key on the given curve
    pub fn generate(curve: EcdsaCurve) -> Result<Self> {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(curve.signing_alg(), &rng)
            .map_err(|_| AcmeError::crypto("Failed to generate ECDSA key"))?;
        Self::from_pkcs8(pkcs8.as_ref(), curve)
    }

    /// Load a key from PKCS#8 DER bytes
    pub fn from_pkcs8(pkcs8: &[u8], curve: EcdsaCurve) -> Result<Self> {
        let rng = SystemRandom::new();
        let key_pair = EcdsaKeyPair::from_pkcs8(curve.signing_alg(), pkcs8, &rng)
            .map_err(|_| AcmeError::crypto("Failed to parse ECDSA key"))?;
        Ok(Self {
            key_pair,
            curve,
            pkcs8: pkcs8.to_vec(),
            rng,
        })
    }

    /// PKCS#8 DER bytes for persistence by the caller
    pub fn to_pkcs8(&self) -> &[u8] {
        &self.pkcs8
    }
}

impl AccountKey for EcdsaAccountKey {
    fn algorithm(&self) -> JwsAlgorithm {
        match self.curve {
            EcdsaCurve::P256 => JwsAlgorithm::Es256,
            EcdsaCurve::P384 => JwsAlgorithm::Es384,
        }
    }

    fn public_jwk(&self) -> Jwk {
        // Uncompressed point: 0x04 || x || y
        let public = self.key_pair.public_key().as_ref();
        let len = self.curve.coordinate_len();
        let x = &public[1..1 + len];
        let y = &public[1 + len..1 + 2 * len];
        Jwk::ec(
            self.curve.crv(),
            URL_SAFE_NO_PAD.encode(x),
            URL_SAFE_NO_PAD.encode(y),
        )
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let signature = self
            .key_pair
            .sign(&self.rng, message)
            .map_err(|_| AcmeError::crypto("ECDSA signing failed"))?;
        Ok(signature.as_ref().to_vec())
    }
}

/// Ed25519 account key (EdDSA)
pub struct Ed25519AccountKey {
    key_pair: Ed25519KeyPair,
    pkcs8: Vec<u8>,
}

impl Ed25519AccountKey {
    /// Generate a fresh key
    pub fn generate() -> Result<Self> {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng)
            .map_err(|_| AcmeError::crypto("Failed to generate Ed25519 key"))?;
        Self::from_pkcs8(pkcs8.as_ref())
    }

    /// Load a key from PKCS#8 DER bytes
    pub fn from_pkcs8(pkcs8: &[u8]) -> Result<Self> {
        let key_pair = Ed25519KeyPair::from_pkcs8(pkcs8)
            .map_err(|_| AcmeError::crypto("Failed to parse Ed25519 key"))?;
        Ok(Self {
            key_pair,
            pkcs8: pkcs8.to_vec(),
        })
    }

    /// PKCS#8 DER bytes for persistence by the caller
    pub fn to_pkcs8(&self) -> &[u8] {
        &self.pkcs8
    }
}

impl AccountKey for Ed25519AccountKey {
    fn algorithm(&self) -> JwsAlgorithm {
        JwsAlgorithm::EdDsa
    }

    fn public_jwk(&self) -> Jwk {
        Jwk::ed25519(URL_SAFE_NO_PAD.encode(self.key_pair.public_key().as_ref()))
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        Ok(self.key_pair.sign(message).as_ref().to_vec())
    }
}

/// RSA account key (RS256)
///
/// ring cannot generate RSA keys; load an existing one from PKCS#8.
pub struct RsaAccountKey {
    key_pair: RsaKeyPair,
    rng: SystemRandom,
}

impl RsaAccountKey {
    /// Load a key from PKCS#8 DER bytes
    pub fn from_pkcs8(pkcs8: &[u8]) -> Result<Self> {
        let key_pair = RsaKeyPair::from_pkcs8(pkcs8)
            .map_err(|_| AcmeError::crypto("Failed to parse RSA key"))?;
        Ok(Self {
            key_pair,
            rng: SystemRandom::new(),
        })
    }
}

impl AccountKey for RsaAccountKey {
    fn algorithm(&self) -> JwsAlgorithm {
        JwsAlgorithm::Rs256
    }

    fn public_jwk(&self) -> Jwk {
        let components: ring::rsa::PublicKeyComponents<Vec<u8>> =
            ring::rsa::PublicKeyComponents::from(self.key_pair.public_key());
        Jwk::rsa(
            URL_SAFE_NO_PAD.encode(&components.n),
            URL_SAFE_NO_PAD.encode(&components.e),
        )
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let mut signature = vec![0u8; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(&RSA_PKCS1_SHA256, &self.rng, message, &mut signature)
            .map_err(|_| AcmeError::crypto("RSA signing failed"))?;
        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring::signature::{ECDSA_P256_SHA256_FIXED, UnparsedPublicKey};

    #[test]
    fn test_algorithm_names() {
        assert_eq!(JwsAlgorithm::Rs256.as_str(), "RS256");
        assert_eq!(JwsAlgorithm::Es256.as_str(), "ES256");
        assert_eq!(JwsAlgorithm::Es384.as_str(), "ES384");
        assert_eq!(JwsAlgorithm::EdDsa.as_str(), "EdDSA");
    }

    #[test]
    fn test_es256_generate_and_sign() {
        let key = EcdsaAccountKey::generate(EcdsaCurve::P256).unwrap();
        assert_eq!(key.algorithm(), JwsAlgorithm::Es256);

        let signature = key.sign(b"message").unwrap();
        // Fixed-width r || s
        assert_eq!(signature.len(), 64);
    }

    #[test]
    fn test_es256_signature_verifies() {
        let key = EcdsaAccountKey::generate(EcdsaCurve::P256).unwrap();
        let message = b"signed exchange";
        let signature = key.sign(message).unwrap();

        let public = UnparsedPublicKey::new(
            &ECDSA_P256_SHA256_FIXED,
            key.key_pair.public_key().as_ref().to_vec(),
        );
        assert!(public.verify(message, &signature).is_ok());
    }

    #[test]
    fn test_es256_jwk_shape() {
        let key = EcdsaAccountKey::generate(EcdsaCurve::P256).unwrap();
        let jwk = key.public_jwk();
        assert_eq!(jwk.kty, "EC");
        assert_eq!(jwk.params.get("crv").unwrap(), "P-256");
        assert!(jwk.thumbprint_sha256().is_ok());
    }

    #[test]
    fn test_es256_pkcs8_round_trip() {
        let key = EcdsaAccountKey::generate(EcdsaCurve::P256).unwrap();
        let reloaded = EcdsaAccountKey::from_pkcs8(key.to_pkcs8(), EcdsaCurve::P256).unwrap();
        assert_eq!(key.public_jwk(), reloaded.public_jwk());
    }

    #[test]
    fn test_ed25519_generate_and_sign() {
        let key = Ed25519AccountKey::generate().unwrap();
        assert_eq!(key.algorithm(), JwsAlgorithm::EdDsa);
        assert_eq!(key.sign(b"message").unwrap().len(), 64);
        assert_eq!(key.public_jwk().kty, "OKP");
    }

    #[test]
    fn test_es384_curve() {
        let key = EcdsaAccountKey::generate(EcdsaCurve::P384).unwrap();
        assert_eq!(key.algorithm(), JwsAlgorithm::Es384);
        assert_eq!(key.public_jwk().params.get("crv").unwrap(), "P-384");
        assert_eq!(key.sign(b"m").unwrap().len(), 96);
    }
}
