/// Issued certificate chains and revocation
use crate::connection::{Connection, split_pem_chain};
use crate::crypto::AccountKey;
use crate::error::Result;
use crate::protocol::ResourceKind;
use crate::protocol::jws::JwsIdentity;
use crate::session::{Login, Session};
use crate::types::RevocationReason;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// An issued certificate chain, leaf first
#[derive(Debug, Clone)]
pub struct CertificateChain {
    certificates: Vec<Vec<u8>>,
    alternates: Vec<String>,
}

impl CertificateChain {
    pub(crate) fn new(certificates: Vec<Vec<u8>>, alternates: Vec<String>) -> Self {
        Self {
            certificates,
            alternates,
        }
    }

    /// Parse a PEM chain into DER blobs, preserving order
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        Ok(Self::new(split_pem_chain(pem)?, Vec::new()))
    }

    /// The end-entity certificate (DER)
    pub fn leaf(&self) -> &[u8] {
        &self.certificates[0]
    }

    /// All certificates (DER), leaf first
    pub fn certificates(&self) -> &[Vec<u8>] {
        &self.certificates
    }

    /// URLs of alternate chains offered via `Link: rel="alternate"`
    pub fn alternate_urls(&self) -> &[String] {
        &self.alternates
    }

    /// Re-encode the chain as PEM
    pub fn to_pem(&self) -> String {
        self.certificates
            .iter()
            .map(|der| pem::encode(&pem::Pem::new("CERTIFICATE", der.clone())))
            .collect()
    }
}

/// Builder for certificate revocation (`revokeCert`)
pub struct RevocationRequest {
    certificate_der: Vec<u8>,
    reason: Option<RevocationReason>,
}

impl RevocationRequest {
    /// Revoke the given DER-encoded certificate
    pub fn new(certificate_der: impl Into<Vec<u8>>) -> Self {
        Self {
            certificate_der: certificate_der.into(),
            reason: None,
        }
    }

    /// Attach a revocation reason
    pub fn with_reason(mut self, reason: RevocationReason) -> Self {
        self.reason = Some(reason);
        self
    }

    fn payload(&self) -> serde_json::Value {
        let mut payload = json!({
            "certificate": URL_SAFE_NO_PAD.encode(&self.certificate_der),
        });
        if let Some(reason) = self.reason {
            payload["reason"] = json!(reason.as_u8());
        }
        payload
    }

    /// Revoke using the account key (`kid` JWS form)
    pub async fn execute(&self, login: &Login) -> Result<()> {
        let session = login.session();
        let revoke_url = session.resource_url(ResourceKind::RevokeCert).await?;
        Connection::new(session)
            .send(
                &revoke_url,
                Some(&self.payload()),
                login.key().as_ref(),
                JwsIdentity::AccountUrl(login.account_url()),
            )
            .await?;
        info!("Certificate revoked");
        Ok(())
    }

    /// Revoke using the certificate's own key pair (`jwk` JWS form)
    ///
    /// Used when the account key is lost but the certificate key is not.
    pub async fn execute_with_key(
        &self,
        session: &Arc<Session>,
        certificate_key: &dyn AccountKey,
    ) -> Result<()> {
        let revoke_url = session.resource_url(ResourceKind::RevokeCert).await?;
        Connection::new(session)
            .send(
                &revoke_url,
                Some(&self.payload()),
                certificate_key,
                JwsIdentity::KeyJwk,
            )
            .await?;
        info!("Certificate revoked with certificate key");
        Ok(())
    }
}
