/// ACME wire protocol building blocks
pub mod directory;
pub mod jwk;
pub mod jws;
pub mod nonce;

pub use directory::{Directory, Metadata, ResourceKind};
pub use jwk::Jwk;
pub use jws::{JwsIdentity, SignedRequest};
pub use nonce::NoncePool;
