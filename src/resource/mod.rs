/// Server-side resources: location URL plus a cached, reloadable body
pub mod account;
pub mod authorization;
pub mod certificate;
pub mod challenge;
pub mod order;

pub use account::{Account, EabCredentials, NewAccount};
pub use authorization::Authorization;
pub use certificate::{CertificateChain, RevocationRequest};
pub use challenge::{Challenge, ChallengeKind, ChallengeRegistry};
pub use order::{NewOrder, Order};

use crate::error::{AcmeError, Result};
use crate::transport::Backoff;
use crate::types::{AuthorizationStatus, ChallengeStatus, OrderStatus};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Options for status polling
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Overall deadline, distinct from per-request timeouts
    pub timeout: Duration,
    /// Backoff between polls when the server sends no `Retry-After`
    pub backoff: Backoff,
    /// Cancellation signal; in-flight polls return promptly when triggered
    pub cancel: Option<CancellationToken>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(180),
            backoff: Backoff::default(),
            cancel: None,
        }
    }
}

impl PollOptions {
    /// Set the overall timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the backoff strategy
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Make the poll cancellable
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// A status that polling can wait on
pub(crate) trait PollStatus: Copy + PartialEq + std::fmt::Display {
    fn is_terminal(&self) -> bool;
}

impl PollStatus for OrderStatus {
    fn is_terminal(&self) -> bool {
        OrderStatus::is_terminal(self)
    }
}

impl PollStatus for AuthorizationStatus {
    fn is_terminal(&self) -> bool {
        AuthorizationStatus::is_terminal(self)
    }
}

impl PollStatus for ChallengeStatus {
    fn is_terminal(&self) -> bool {
        ChallengeStatus::is_terminal(self)
    }
}

/// A resource whose status can be re-fetched
pub(crate) trait Pollable {
    type Status: PollStatus;

    /// Refresh the cached body, returning the new status and the server's
    /// `Retry-After` hint
    async fn poll_once(&mut self) -> Result<(Self::Status, Option<Duration>)>;
}

/// Re-fetch a resource until it reaches `target`, enters another terminal
/// status, the timeout expires, or the caller cancels
///
/// Sleeps per the server's `Retry-After` when present, otherwise per the
/// configured backoff. Returns the final status; callers distinguish target
/// from terminal-but-wrong outcomes by comparing.
pub(crate) async fn wait_for<P: Pollable>(
    resource: &mut P,
    target: P::Status,
    options: &PollOptions,
) -> Result<P::Status> {
    let deadline = Instant::now() + options.timeout;
    let mut attempt = 0u32;

    loop {
        if let Some(cancel) = &options.cancel
            && cancel.is_cancelled()
        {
            return Err(AcmeError::Cancelled);
        }

        let (status, retry_after) = resource.poll_once().await?;
        if status == target || status.is_terminal() {
            return Ok(status);
        }

        let delay = retry_after.unwrap_or_else(|| options.backoff.delay(attempt));
        attempt += 1;
        debug!(%status, ?delay, "Resource not ready, polling again");

        if Instant::now() + delay >= deadline {
            return Err(AcmeError::timeout(format!(
                "Still {} after {:?}",
                status, options.timeout
            )));
        }

        match &options.cancel {
            Some(cancel) => {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(AcmeError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            None => tokio::time::sleep(delay).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Script {
        steps: Vec<(OrderStatus, Option<Duration>)>,
        index: usize,
    }

    impl Pollable for Script {
        type Status = OrderStatus;

        async fn poll_once(&mut self) -> Result<(OrderStatus, Option<Duration>)> {
            let step = self.steps[self.index.min(self.steps.len() - 1)];
            self.index += 1;
            Ok(step)
        }
    }

    fn options() -> PollOptions {
        PollOptions::default()
            .with_timeout(Duration::from_secs(5))
            .with_backoff(Backoff::Fixed(Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_wait_reaches_target() {
        let mut script = Script {
            steps: vec![
                (OrderStatus::Pending, None),
                (OrderStatus::Ready, None),
            ],
            index: 0,
        };
        let status = wait_for(&mut script, OrderStatus::Ready, &options())
            .await
            .unwrap();
        assert_eq!(status, OrderStatus::Ready);
        assert_eq!(script.index, 2);
    }

    #[tokio::test]
    async fn test_wait_stops_on_terminal_non_target() {
        let mut script = Script {
            steps: vec![
                (OrderStatus::Processing, None),
                (OrderStatus::Invalid, None),
            ],
            index: 0,
        };
        let status = wait_for(&mut script, OrderStatus::Valid, &options())
            .await
            .unwrap();
        assert_eq!(status, OrderStatus::Invalid);
    }

    #[tokio::test]
    async fn test_wait_honors_retry_after() {
        let mut script = Script {
            steps: vec![
                (OrderStatus::Processing, Some(Duration::from_millis(60))),
                (OrderStatus::Valid, None),
            ],
            index: 0,
        };
        let started = Instant::now();
        wait_for(&mut script, OrderStatus::Valid, &options())
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let mut script = Script {
            steps: vec![(OrderStatus::Processing, Some(Duration::from_secs(60)))],
            index: 0,
        };
        let options = options().with_timeout(Duration::from_millis(20));
        let err = wait_for(&mut script, OrderStatus::Valid, &options)
            .await
            .unwrap_err();
        assert!(matches!(err, AcmeError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_wait_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut script = Script {
            steps: vec![(OrderStatus::Processing, None)],
            index: 0,
        };
        let options = options().with_cancel(cancel);
        let err = wait_for(&mut script, OrderStatus::Valid, &options)
            .await
            .unwrap_err();
        assert!(matches!(err, AcmeError::Cancelled));
    }
}
