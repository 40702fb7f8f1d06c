//! Hybrid payload sealing: one-time AES-128 key, wrapped with the merchant RSA key

use aes::Aes128;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ecb::cipher::block_padding::Pkcs7;
use ecb::cipher::{BlockEncryptMut, KeyInit};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use tracing::debug;

use crate::domain::payload::{CheckoutPayload, SealedSession, SessionPayload};
use crate::shared::error::{AppError, AppResult};

/// Symmetric key length in bytes
pub const SESSION_KEY_LEN: usize = 16;

type Aes128EcbEnc = ecb::Encryptor<Aes128>;

/// Merchant private key applying the raw PKCS#1 v1.5 private-key transform
#[derive(Clone)]
pub struct KeyWrapper {
    key: RsaPrivateKey,
}

impl std::fmt::Debug for KeyWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyWrapper").field("bits", &(self.key.size() * 8)).finish()
    }
}

impl KeyWrapper {
    /// Parse a PKCS#8 or PKCS#1 PEM private key
    pub fn from_pem(pem: &str) -> AppResult<Self> {
        let pem = pem.trim();
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| AppError::CryptoConfig(format!("unreadable private key: {}", e)))?;
        Ok(Self { key })
    }

    /// Transform a short value with the private key (type 1 padding, no digest prefix)
    pub fn wrap(&self, data: &[u8]) -> AppResult<Vec<u8>> {
        self.key
            .sign(Pkcs1v15Sign::new_unprefixed(), data)
            .map_err(|e| AppError::CryptoConfig(format!("private key transform failed: {}", e)))
    }

    /// Run the transform once on a dummy value
    pub fn probe(&self) -> AppResult<()> {
        self.wrap(&[0u8; SESSION_KEY_LEN]).map(|_| ())
    }

    pub fn public_key(&self) -> RsaPublicKey {
        self.key.to_public_key()
    }
}

/// Seals checkout payloads for the payment widget
#[derive(Debug, Clone)]
pub struct PayloadSealer {
    wrapper: Option<KeyWrapper>,
    test_mode: bool,
}

impl PayloadSealer {
    /// A key is mandatory outside test mode
    pub fn new(private_key_pem: &str, test_mode: bool) -> AppResult<Self> {
        let wrapper = if private_key_pem.trim().is_empty() {
            None
        } else {
            Some(KeyWrapper::from_pem(private_key_pem)?)
        };
        if wrapper.is_none() && !test_mode {
            return Err(AppError::CryptoConfig("private key is not configured".to_string()));
        }
        Ok(Self { wrapper, test_mode })
    }

    pub fn test_mode(&self) -> bool {
        self.test_mode
    }

    pub fn seal(&self, payload: CheckoutPayload) -> AppResult<SealedSession> {
        if self.test_mode {
            debug!(items = payload.items.len(), "Test mode: sending payload unencrypted");
            return Ok(SealedSession { payload: SessionPayload::Plain(payload), key: String::new() });
        }

        let wrapper = self
            .wrapper
            .as_ref()
            .ok_or_else(|| AppError::CryptoConfig("private key is not configured".to_string()))?;

        let mut session_key = [0u8; SESSION_KEY_LEN];
        OsRng.fill_bytes(&mut session_key);

        let plaintext = serde_json::to_vec(&payload)?;
        let ciphertext = Aes128EcbEnc::new(&session_key.into()).encrypt_padded_vec_mut::<Pkcs7>(&plaintext);
        let wrapped_key = wrapper.wrap(&session_key)?;

        Ok(SealedSession {
            payload: SessionPayload::Encrypted(BASE64.encode(ciphertext)),
            key: BASE64.encode(wrapped_key),
        })
    }
}
