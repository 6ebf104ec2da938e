//! # Local Key Provider
//!
//! A [`ProviderGateway`] backed by an in-process ed25519 key, used by the
//! binary and by integration tests where no browser extension exists.
//! The address is the base58-encoded public key; signatures are base58 too.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use rand::Rng;

use crate::core::error::ConfigError;
use crate::core::service::{AccountsResponse, ProviderGateway};
use crate::provider::connection::CODE_OK;

pub struct LocalKeyGateway {
    signing_key: SigningKey,
    address: String,
    /// Site authorisation, granted by the first account request.
    authorized: AtomicBool,
    locked: AtomicBool,
}

impl LocalKeyGateway {
    pub fn new(signing_key: SigningKey) -> Self {
        let address = bs58::encode(signing_key.verifying_key().as_bytes()).into_string();
        Self {
            signing_key,
            address,
            authorized: AtomicBool::new(false),
            locked: AtomicBool::new(false),
        }
    }

    /// Fresh random key.
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::rng().fill(&mut seed);
        Self::new(SigningKey::from_bytes(&seed))
    }

    /// Key from a base58-encoded 32-byte secret.
    pub fn from_base58_secret(secret: &str) -> Result<Self, ConfigError> {
        let bytes = bs58::decode(secret.trim())
            .into_vec()
            .map_err(|e| ConfigError::Invalid(format!("signing key is not base58: {}", e)))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ConfigError::Invalid("signing key must be 32 bytes".to_string()))?;
        Ok(Self::new(SigningKey::from_bytes(&seed)))
    }

    /// Start out as if the user had already authorised this site.
    pub fn pre_authorized(self) -> Self {
        self.authorized.store(true, Ordering::SeqCst);
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn set_locked(&self, locked: bool) {
        self.locked.store(locked, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProviderGateway for LocalKeyGateway {
    fn detect(&self) -> bool {
        true
    }

    fn default_address(&self) -> Option<String> {
        if self.authorized.load(Ordering::SeqCst) && !self.locked.load(Ordering::SeqCst) {
            Some(self.address.clone())
        } else {
            None
        }
    }

    async fn request_accounts(&self) -> AccountsResponse {
        if self.locked.load(Ordering::SeqCst) {
            // A locked provider answers without a code
            return AccountsResponse::default();
        }
        self.authorized.store(true, Ordering::SeqCst);
        AccountsResponse::with_code(CODE_OK)
    }

    fn supports_signing(&self) -> bool {
        true
    }

    async fn sign_message(&self, message: &str) -> Result<String, String> {
        if self.locked.load(Ordering::SeqCst) {
            return Err("wallet is locked".to_string());
        }
        let signature = self.signing_key.sign(message.as_bytes());
        Ok(bs58::encode(signature.to_bytes()).into_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    #[tokio::test]
    async fn test_authorisation_flow() {
        let gateway = LocalKeyGateway::new(SigningKey::from_bytes(&[7u8; 32]));
        assert!(gateway.detect());
        assert_eq!(gateway.default_address(), None);

        let response = gateway.request_accounts().await;
        assert_eq!(response.code, Some(CODE_OK));
        assert_eq!(gateway.default_address().as_deref(), Some(gateway.address()));
    }

    #[tokio::test]
    async fn test_locked_answers_without_code() {
        let gateway = LocalKeyGateway::generate().pre_authorized();
        gateway.set_locked(true);

        assert_eq!(gateway.request_accounts().await.code, None);
        assert_eq!(gateway.default_address(), None);
        assert!(gateway.sign_message("hello").await.is_err());
    }

    #[tokio::test]
    async fn test_signature_verifies_against_address() {
        let gateway = LocalKeyGateway::generate();
        let signature = gateway.sign_message("Link wallet").await.unwrap();

        let key_bytes: [u8; 32] = bs58::decode(gateway.address()).into_vec().unwrap().try_into().unwrap();
        let sig_bytes: [u8; 64] = bs58::decode(&signature).into_vec().unwrap().try_into().unwrap();
        let key = VerifyingKey::from_bytes(&key_bytes).unwrap();

        assert!(key.verify(b"Link wallet", &Signature::from_bytes(&sig_bytes)).is_ok());
    }

    #[test]
    fn test_from_base58_secret() {
        let secret = bs58::encode([9u8; 32]).into_string();
        let a = LocalKeyGateway::from_base58_secret(&secret).unwrap();
        let b = LocalKeyGateway::new(SigningKey::from_bytes(&[9u8; 32]));
        assert_eq!(a.address(), b.address());

        assert!(LocalKeyGateway::from_base58_secret("0OIl").is_err());
        assert!(LocalKeyGateway::from_base58_secret(&bs58::encode([1u8; 8]).into_string()).is_err());
    }
}
