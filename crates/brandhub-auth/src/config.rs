//! Authentication configuration.

use std::fmt;

/// Configuration for token issuance and credential handling.
#[derive(Clone)]
pub struct AuthConfig {
    /// PEM-encoded Ed25519 private key for JWT signing.
    pub jwt_private_key_pem: String,
    /// PEM-encoded Ed25519 public key for JWT verification.
    pub jwt_public_key_pem: String,
    /// Lifetime of Principal and Brand tokens alike, in seconds
    /// (default: 86_400 = 24 hours). There is no refresh mechanism.
    pub token_lifetime_secs: u64,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Optional pepper prepended to passwords before Argon2id hashing.
    pub pepper: Option<String>,
    /// Minimum Principal password length.
    pub min_password_length: usize,
    /// 256-bit AES-GCM key sealing database-principal secrets at rest.
    pub credential_encryption_key: [u8; 32],
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_private_key_pem: String::new(),
            jwt_public_key_pem: String::new(),
            token_lifetime_secs: 86_400,
            jwt_issuer: "brandhub".into(),
            pepper: None,
            min_password_length: 12,
            credential_encryption_key: [0u8; 32],
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_lifetime_secs", &self.token_lifetime_secs)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("pepper", &self.pepper.as_ref().map(|_| "<redacted>"))
            .field("min_password_length", &self.min_password_length)
            .finish_non_exhaustive()
    }
}
