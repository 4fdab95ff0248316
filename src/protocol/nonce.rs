/// Anti-replay nonce handling
use crate::error::{AcmeError, Result};
use crate::transport::HttpTransport;
use tokio::sync::Mutex;
use tracing::debug;

/// Name of the nonce header on every ACME response
pub const REPLAY_NONCE: &str = "replay-nonce";

/// Single-slot cache of the next anti-replay nonce
///
/// Holds at most one nonce. Every consumed nonce is replaced from the
/// `Replay-Nonce` header of the next exchange; when the slot is empty a
/// HEAD on the `newNonce` endpoint mints a fresh one.
#[derive(Default)]
pub struct NoncePool {
    slot: Mutex<Option<String>>,
}

impl NoncePool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the stored nonce, or fetch a fresh one from `new_nonce_url`
    pub async fn take(&self, transport: &HttpTransport, new_nonce_url: &str) -> Result<String> {
        {
            let mut slot = self.slot.lock().await;
            if let Some(nonce) = slot.take() {
                return Ok(nonce);
            }
        }

        debug!("Nonce pool empty, requesting fresh nonce");
        let response = transport.head(new_nonce_url).await?;
        if !response.is_success() {
            return Err(AcmeError::protocol(format!(
                "Failed to fetch nonce: HTTP {}",
                response.status
            )));
        }

        response
            .header(REPLAY_NONCE)
            .map(|s| s.to_string())
            .ok_or_else(|| AcmeError::protocol("Missing Replay-Nonce header"))
    }

    /// Store a nonce for the next signed request, replacing any previous one
    pub async fn store(&self, nonce: impl Into<String>) {
        let mut slot = self.slot.lock().await;
        *slot = Some(nonce.into());
    }

    /// Discard the stored nonce, if any
    pub async fn clear(&self) {
        let mut slot = self.slot.lock().await;
        *slot = None;
    }

    /// Whether the slot currently holds a nonce
    pub async fn is_empty(&self) -> bool {
        self.slot.lock().await.is_none()
    }
}
