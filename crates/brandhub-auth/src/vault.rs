//! AES-256-GCM sealing of secrets kept at rest.
//!
//! Database-principal passwords are stored sealed in the brand catalog
//! and opened only by the process holding the server key.

use std::fmt;

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::AuthError;

const NONCE_LEN: usize = 12;

#[derive(Clone)]
pub struct SecretVault {
    key: [u8; 32],
}

impl fmt::Debug for SecretVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretVault(<redacted>)")
    }
}

impl SecretVault {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Returns `base64(nonce || ciphertext || tag)`.
    pub fn seal(&self, plaintext: &[u8]) -> Result<String, AuthError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| AuthError::Crypto(format!("AES-GCM encrypt: {e}")))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(combined))
    }

    pub fn open(&self, sealed: &str) -> Result<Vec<u8>, AuthError> {
        let combined = STANDARD
            .decode(sealed)
            .map_err(|e| AuthError::Crypto(format!("base64 decode: {e}")))?;

        if combined.len() <= NONCE_LEN {
            return Err(AuthError::Crypto("ciphertext too short".into()));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let nonce = Nonce::from_slice(nonce_bytes);

        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| AuthError::Crypto(format!("AES-GCM decrypt: {e}")))
    }

    /// [`SecretVault::open`] for secrets that were UTF-8 when sealed.
    pub fn open_string(&self, sealed: &str) -> Result<String, AuthError> {
        String::from_utf8(self.open(sealed)?)
            .map_err(|e| AuthError::Crypto(format!("sealed secret is not UTF-8: {e}")))
    }
}
