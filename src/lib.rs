//! # AcmeKit - ACME v2 Protocol Client
//!
//! An async Rust client for ACME v2 servers (RFC 8555): signed JWS
//! transport with anti-replay nonce recovery, resource state machines for
//! accounts, orders, authorizations and challenges, RFC 7807 problem
//! mapping, and pluggable CA providers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use acmekit::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> acmekit::Result<()> {
//!     let session = Session::new("acme://letsencrypt.org/staging")?;
//!     let key = Arc::new(EcdsaAccountKey::generate(EcdsaCurve::P256)?);
//!
//!     let account = NewAccount::new()
//!         .with_contact(Contact::email("admin@example.com"))
//!         .agree_to_terms()
//!         .create(&session, key)
//!         .await?;
//!
//!     let mut order = NewOrder::dns(&["example.com"])?
//!         .create(account.login())
//!         .await?;
//!
//!     for mut authorization in order.authorizations().await? {
//!         authorization.load().await?;
//!         // Fulfil a challenge, then trigger and poll it...
//!     }
//!
//!     order.wait_until_ready(&PollOptions::default()).await?;
//!     // order.finalize(&csr_der).await?; ...
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub(crate) mod connection;
pub mod crypto;
pub mod error;
pub mod problem;
pub mod protocol;
pub mod provider;
pub mod resource;
pub mod session;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use crypto::{
    AccountKey, EcdsaAccountKey, EcdsaCurve, Ed25519AccountKey, JwsAlgorithm, KeyAuthorization,
    RsaAccountKey,
};
pub use error::{AcmeError, Result};
pub use problem::Problem;
pub use protocol::{Directory, Jwk, Metadata, ResourceKind};
pub use provider::{AcmeProvider, GenericProvider, LetsEncryptProvider, PebbleProvider, ProviderRegistry};
#[cfg(feature = "zerossl-ca")]
pub use provider::ZeroSslProvider;
pub use resource::{
    Account, Authorization, CertificateChain, Challenge, ChallengeKind, ChallengeRegistry,
    EabCredentials, NewAccount, NewOrder, Order, PollOptions, RevocationRequest,
};
pub use session::{Login, Session, SessionBuilder};
pub use transport::{Backoff, TransportSettings};
pub use types::{
    AccountStatus, AuthorizationStatus, ChallengeStatus, Contact, Identifier, OrderStatus,
    RevocationReason,
};

/// Commonly used types
pub mod prelude {
    pub use crate::crypto::{AccountKey, EcdsaAccountKey, EcdsaCurve};
    pub use crate::error::{AcmeError, Result};
    pub use crate::resource::{
        Account, Authorization, Challenge, NewAccount, NewOrder, Order, PollOptions,
    };
    pub use crate::session::{Login, Session};
    pub use crate::types::{Contact, Identifier};
}
