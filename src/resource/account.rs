/// Account lifecycle: creation, modification, key rollover, deactivation
use crate::connection::Connection;
use crate::crypto::AccountKey;
use crate::error::{AcmeError, Result};
use crate::protocol::ResourceKind;
use crate::protocol::jws::{self, JwsIdentity};
use crate::session::{Login, Session};
use crate::types::{AccountStatus, Contact};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use hmac::{Hmac, KeyInit, Mac};
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::{Sha256, Sha384, Sha512};
use std::sync::Arc;
use tracing::info;

/// Pre-shared credentials for an external account binding
#[derive(Debug, Clone)]
pub struct EabCredentials {
    /// Key identifier issued by the CA
    pub key_id: String,
    /// MAC key, base64url encoded
    pub hmac_key: String,
}

/// Cached account document
#[derive(Debug, Clone, Deserialize)]
pub struct AccountData {
    /// Account status
    pub status: AccountStatus,

    /// Contact URIs
    #[serde(default)]
    pub contact: Vec<String>,

    /// Terms of service agreed
    #[serde(rename = "termsOfServiceAgreed", default)]
    pub terms_of_service_agreed: bool,

    /// External account binding object, as returned by the server
    #[serde(rename = "externalAccountBinding", default)]
    pub external_account_binding: Option<Value>,

    /// URL of the account's orders collection
    #[serde(default)]
    pub orders: Option<String>,
}

/// An account resource located by its URL
pub struct Account {
    login: Login,
    data: Option<AccountData>,
    newly_created: bool,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("url", &self.login.account_url())
            .field("data", &self.data)
            .field("newly_created", &self.newly_created)
            .finish()
    }
}

impl Account {
    /// Bind an account to its login without fetching it
    pub fn bind(login: Login) -> Self {
        Self {
            login,
            data: None,
            newly_created: false,
        }
    }

    /// The immutable account URL
    pub fn url(&self) -> &str {
        self.login.account_url()
    }

    /// The login backing this account
    pub fn login(&self) -> &Login {
        &self.login
    }

    /// True if `create` registered a new account rather than finding one
    pub fn is_newly_created(&self) -> bool {
        self.newly_created
    }

    /// The cached account document, if loaded
    pub fn data(&self) -> Option<&AccountData> {
        self.data.as_ref()
    }

    /// The cached status, if loaded
    pub fn status(&self) -> Option<AccountStatus> {
        self.data.as_ref().map(|d| d.status)
    }

    /// True if the cached status is `valid`
    pub fn is_valid(&self) -> bool {
        self.status() == Some(AccountStatus::Valid)
    }

    /// URL of the orders collection, once loaded
    pub fn orders_url(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.orders.as_deref())
    }

    /// Re-fetch the account document, replacing the cache
    pub async fn fetch(&mut self) -> Result<&AccountData> {
        let session = self.login.session();
        let response = Connection::new(session)
            .post_as_get(
                self.login.account_url(),
                self.login.key().as_ref(),
                JwsIdentity::AccountUrl(self.login.account_url()),
            )
            .await?;
        self.data = Some(serde_json::from_value(response.require_json()?.clone())?);
        Ok(self.data.as_ref().unwrap())
    }

    /// Load the account document if it is not cached yet
    pub async fn load(&mut self) -> Result<&AccountData> {
        if self.data.is_none() {
            self.fetch().await?;
        }
        Ok(self.data.as_ref().unwrap())
    }

    /// Replace the account's contact list
    pub async fn update_contacts(&mut self, contacts: &[Contact]) -> Result<()> {
        let uris: Vec<String> = contacts.iter().map(Contact::to_uri).collect();
        self.post_update(json!({ "contact": uris })).await
    }

    /// Deactivate the account; the server will refuse further requests
    pub async fn deactivate(&mut self) -> Result<()> {
        info!(account = self.url(), "Deactivating account");
        self.post_update(json!({ "status": "deactivated" })).await
    }

    async fn post_update(&mut self, payload: Value) -> Result<()> {
        let session = self.login.session();
        let response = Connection::new(session)
            .send(
                self.login.account_url(),
                Some(&payload),
                self.login.key().as_ref(),
                JwsIdentity::AccountUrl(self.login.account_url()),
            )
            .await?;
        self.data = Some(serde_json::from_value(response.require_json()?.clone())?);
        Ok(())
    }

    /// Roll the account over to a new key pair (RFC 8555 §7.3.5)
    ///
    /// The inner JWS is signed by the new key with its public JWK embedded
    /// and no nonce; the outer JWS is signed by the current key using the
    /// account URL. On success the returned login carries the new key and
    /// the old one must no longer be used.
    pub async fn change_key(&self, new_key: Arc<dyn AccountKey>) -> Result<Login> {
        let session = self.login.session();
        let key_change_url = session.resource_url(ResourceKind::KeyChange).await?;

        let inner_payload = json!({
            "account": self.login.account_url(),
            "oldKey": self.login.key().public_jwk().to_value(),
        });
        let inner = jws::sign(
            new_key.as_ref(),
            JwsIdentity::KeyJwk,
            None,
            &key_change_url,
            &serde_json::to_vec(&inner_payload)?,
        )?;

        Connection::new(session)
            .send(
                &key_change_url,
                Some(&inner.to_value()?),
                self.login.key().as_ref(),
                JwsIdentity::AccountUrl(self.login.account_url()),
            )
            .await?;

        info!(account = self.url(), "Account key rolled over");
        Ok(self.login.with_key(new_key))
    }
}

/// Builder for account creation (`newAccount`)
#[derive(Default)]
pub struct NewAccount {
    contacts: Vec<Contact>,
    terms_of_service_agreed: bool,
    only_return_existing: bool,
    eab: Option<EabCredentials>,
}

impl NewAccount {
    /// Start a new account request
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a contact
    pub fn with_contact(mut self, contact: Contact) -> Self {
        self.contacts.push(contact);
        self
    }

    /// Agree to the terms of service
    pub fn agree_to_terms(mut self) -> Self {
        self.terms_of_service_agreed = true;
        self
    }

    /// Only look up an existing account; fail with account-not-found if the
    /// key has none
    pub fn only_return_existing(mut self) -> Self {
        self.only_return_existing = true;
        self
    }

    /// Attach an external account binding
    pub fn external_account_binding(mut self, credentials: EabCredentials) -> Self {
        self.eab = Some(credentials);
        self
    }

    /// Create or look up the account
    ///
    /// The request is signed with the embedded `jwk` form. A 201 means the
    /// account was created, a 200 that it already existed; the `Location`
    /// header is the account URL either way.
    pub async fn create(
        self,
        session: &Arc<Session>,
        key: Arc<dyn AccountKey>,
    ) -> Result<Account> {
        let new_account_url = session.resource_url(ResourceKind::NewAccount).await?;

        let mut payload = serde_json::Map::new();
        if !self.contacts.is_empty() {
            let uris: Vec<String> = self.contacts.iter().map(Contact::to_uri).collect();
            payload.insert("contact".to_string(), json!(uris));
        }
        if self.terms_of_service_agreed {
            payload.insert("termsOfServiceAgreed".to_string(), json!(true));
        }
        if self.only_return_existing {
            payload.insert("onlyReturnExisting".to_string(), json!(true));
        }
        if let Some(credentials) = &self.eab {
            let mac_alg = session.provider().eab_mac_algorithm().unwrap_or("HS256");
            payload.insert(
                "externalAccountBinding".to_string(),
                external_account_binding(key.as_ref(), &new_account_url, credentials, mac_alg)?,
            );
        }

        let response = Connection::new(session)
            .send(
                &new_account_url,
                Some(&Value::Object(payload)),
                key.as_ref(),
                JwsIdentity::KeyJwk,
            )
            .await?;

        let account_url = response.require_location()?;
        let newly_created = response.status == 201;
        let data = match response.require_json() {
            Ok(value) => Some(serde_json::from_value(value.clone())?),
            Err(_) => None,
        };

        info!(account = %account_url, newly_created, "Account registered");
        Ok(Account {
            login: Login::new(Arc::clone(session), account_url, key),
            data,
            newly_created,
        })
    }
}

/// Build the external account binding JWS (RFC 8555 §7.3.4)
fn external_account_binding(
    key: &dyn AccountKey,
    new_account_url: &str,
    credentials: &EabCredentials,
    mac_alg: &str,
) -> Result<Value> {
    let protected = json!({
        "alg": mac_alg,
        "kid": credentials.key_id,
        "url": new_account_url,
    });
    let protected_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&protected)?);
    let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&key.public_jwk())?);
    let signing_input = format!("{}.{}", protected_b64, payload_b64);

    let mac_key = decode_eab_key(&credentials.hmac_key)?;
    let input = signing_input.as_bytes();
    let signature = match mac_alg {
        "HS256" => {
            let mut mac = Hmac::<Sha256>::new_from_slice(&mac_key)
                .map_err(|_| AcmeError::crypto("Invalid EAB MAC key"))?;
            mac.update(input);
            mac.finalize().into_bytes().to_vec()
        }
        "HS384" => {
            let mut mac = Hmac::<Sha384>::new_from_slice(&mac_key)
                .map_err(|_| AcmeError::crypto("Invalid EAB MAC key"))?;
            mac.update(input);
            mac.finalize().into_bytes().to_vec()
        }
        "HS512" => {
            let mut mac = Hmac::<Sha512>::new_from_slice(&mac_key)
                .map_err(|_| AcmeError::crypto("Invalid EAB MAC key"))?;
            mac.update(input);
            mac.finalize().into_bytes().to_vec()
        }
        other => {
            return Err(AcmeError::invalid_input(format!(
                "Unsupported EAB MAC algorithm: {}",
                other
            )));
        }
    };

    Ok(json!({
        "protected": protected_b64,
        "payload": payload_b64,
        "signature": URL_SAFE_NO_PAD.encode(signature),
    }))
}

fn decode_eab_key(encoded: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(encoded)
        .or_else(|_| STANDARD.decode(encoded))
        .map_err(|e| AcmeError::invalid_input(format!("Failed to decode EAB key: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{EcdsaAccountKey, EcdsaCurve};

    async fn mock_directory(server: &mut mockito::Server) {
        let base = server.url();
        server
            .mock("GET", "/directory")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{
                    "newNonce": "{base}/acme/new-nonce",
                    "newAccount": "{base}/acme/new-account",
                    "newOrder": "{base}/acme/new-order",
                    "revokeCert": "{base}/acme/revoke-cert",
                    "keyChange": "{base}/acme/key-change"
                }}"#
            ))
            .create_async()
            .await;
        server
            .mock("HEAD", "/acme/new-nonce")
            .with_status(200)
            .with_header("Replay-Nonce", "nonce")
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn test_create_account() {
        let mut server = mockito::Server::new_async().await;
        mock_directory(&mut server).await;
        let base = server.url();

        let mock = server
            .mock("POST", "/acme/new-account")
            .match_header("content-type", "application/jose+json")
            .with_status(201)
            .with_header("Replay-Nonce", "next")
            .with_header("Location", &format!("{base}/acme/acct/17"))
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "status": "valid",
                    "contact": ["mailto:admin@example.com"],
                    "termsOfServiceAgreed": true,
                    "orders": "https://ca.example/acme/acct/17/orders"
                }"#,
            )
            .create_async()
            .await;

        let session = crate::session::Session::new(format!("{base}/directory")).unwrap();
        let key = Arc::new(EcdsaAccountKey::generate(EcdsaCurve::P256).unwrap());
        let account = NewAccount::new()
            .with_contact(Contact::email("admin@example.com"))
            .agree_to_terms()
            .create(&session, key)
            .await
            .unwrap();

        assert!(account.is_newly_created());
        assert_eq!(account.url(), format!("{base}/acme/acct/17"));
        assert!(account.is_valid());
        assert_eq!(
            account.orders_url(),
            Some("https://ca.example/acme/acct/17/orders")
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_existing_account_is_not_newly_created() {
        let mut server = mockito::Server::new_async().await;
        mock_directory(&mut server).await;
        let base = server.url();

        server
            .mock("POST", "/acme/new-account")
            .with_status(200)
            .with_header("Replay-Nonce", "next")
            .with_header("Location", &format!("{base}/acme/acct/17"))
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "valid", "contact": []}"#)
            .create_async()
            .await;

        let session = crate::session::Session::new(format!("{base}/directory")).unwrap();
        let key = Arc::new(EcdsaAccountKey::generate(EcdsaCurve::P256).unwrap());
        let account = NewAccount::new()
            .only_return_existing()
            .create(&session, key)
            .await
            .unwrap();
        assert!(!account.is_newly_created());
    }

    #[tokio::test]
    async fn test_only_return_existing_maps_account_not_found() {
        let mut server = mockito::Server::new_async().await;
        mock_directory(&mut server).await;
        let base = server.url();

        server
            .mock("POST", "/acme/new-account")
            .with_status(400)
            .with_header("Replay-Nonce", "next")
            .with_header("content-type", "application/problem+json")
            .with_body(r#"{"type": "urn:ietf:params:acme:error:accountDoesNotExist"}"#)
            .create_async()
            .await;

        let session = crate::session::Session::new(format!("{base}/directory")).unwrap();
        let key = Arc::new(EcdsaAccountKey::generate(EcdsaCurve::P256).unwrap());
        let err = NewAccount::new()
            .only_return_existing()
            .create(&session, key)
            .await
            .unwrap_err();
        assert!(matches!(err, AcmeError::AccountNotFound(_)));
    }

    #[tokio::test]
    async fn test_deactivate_posts_status() {
        let mut server = mockito::Server::new_async().await;
        mock_directory(&mut server).await;
        let base = server.url();

        let mock = server
            .mock("POST", "/acme/acct/1")
            .with_status(200)
            .with_header("Replay-Nonce", "next")
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "deactivated", "contact": []}"#)
            .create_async()
            .await;

        let session = crate::session::Session::new(format!("{base}/directory")).unwrap();
        let key = Arc::new(EcdsaAccountKey::generate(EcdsaCurve::P256).unwrap());
        let login = Login::new(Arc::clone(&session), format!("{base}/acme/acct/1"), key);
        let mut account = login.account();
        account.deactivate().await.unwrap();

        assert_eq!(account.status(), Some(AccountStatus::Deactivated));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_change_key_builds_nested_jws() {
        let mut server = mockito::Server::new_async().await;
        mock_directory(&mut server).await;
        let base = server.url();

        let old_key = Arc::new(EcdsaAccountKey::generate(EcdsaCurve::P256).unwrap());
        let new_key = Arc::new(EcdsaAccountKey::generate(EcdsaCurve::P256).unwrap());
        let account_url = format!("{base}/acme/acct/1");

        // The outer JWS is signed by the old key with the kid header and the
        // keyChange URL. Its payload wraps the inner JWS, whose shape is
        // covered by the jws module tests.
        let key_change_url = format!("{base}/acme/key-change");
        let outer_protected = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&json!({
                "alg": "ES256",
                "kid": account_url,
                "nonce": "nonce",
                "url": key_change_url,
            }))
            .unwrap(),
        );
        let mock = server
            .mock("POST", "/acme/key-change")
            .match_body(mockito::Matcher::Regex(outer_protected))
            .with_status(200)
            .with_header("Replay-Nonce", "next")
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "valid", "contact": []}"#)
            .create_async()
            .await;

        let session = crate::session::Session::new(format!("{base}/directory")).unwrap();
        let login = Login::new(Arc::clone(&session), account_url, old_key);
        let account = login.account();
        let rolled = account.change_key(new_key.clone()).await.unwrap();

        assert_eq!(rolled.account_url(), login.account_url());
        assert_eq!(rolled.key().public_jwk(), new_key.public_jwk());
        mock.assert_async().await;
    }

    #[test]
    fn test_external_account_binding_shape() {
        let key = EcdsaAccountKey::generate(EcdsaCurve::P256).unwrap();
        let credentials = EabCredentials {
            key_id: "kid-123".to_string(),
            hmac_key: URL_SAFE_NO_PAD.encode(b"a-very-secret-mac-key"),
        };

        let binding = external_account_binding(
            &key,
            "https://ca.example/acme/new-account",
            &credentials,
            "HS256",
        )
        .unwrap();

        let protected: Value = serde_json::from_slice(
            &URL_SAFE_NO_PAD
                .decode(binding["protected"].as_str().unwrap())
                .unwrap(),
        )
        .unwrap();
        assert_eq!(protected["alg"], "HS256");
        assert_eq!(protected["kid"], "kid-123");
        assert_eq!(protected["url"], "https://ca.example/acme/new-account");

        let payload: Value = serde_json::from_slice(
            &URL_SAFE_NO_PAD
                .decode(binding["payload"].as_str().unwrap())
                .unwrap(),
        )
        .unwrap();
        assert_eq!(payload, serde_json::to_value(key.public_jwk()).unwrap());
        assert!(!binding["signature"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_eab_key_decoding_accepts_both_alphabets() {
        assert!(decode_eab_key(&URL_SAFE_NO_PAD.encode(b"secret")).is_ok());
        assert!(decode_eab_key(&STANDARD.encode(b"secret")).is_ok());
        assert!(decode_eab_key("!!!").is_err());
    }

    #[test]
    fn test_unknown_eab_mac_algorithm_rejected() {
        let key = EcdsaAccountKey::generate(EcdsaCurve::P256).unwrap();
        let credentials = EabCredentials {
            key_id: "kid".to_string(),
            hmac_key: URL_SAFE_NO_PAD.encode(b"k"),
        };
        assert!(
            external_account_binding(&key, "https://x/", &credentials, "HS1024").is_err()
        );
    }
}
