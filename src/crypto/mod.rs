/// Account key signing and key-authorization derivations
pub mod key_auth;
pub mod keypair;

pub use key_auth::KeyAuthorization;
pub use keypair::{AccountKey, EcdsaAccountKey, EcdsaCurve, Ed25519AccountKey, JwsAlgorithm, RsaAccountKey};
