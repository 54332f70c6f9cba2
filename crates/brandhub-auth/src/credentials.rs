//! Random API credential issuance.
//!
//! A brand owner receives an API key (public login name) and an API
//! password (secret). Both come from the thread-local CSPRNG, which is
//! seeded from the operating system.

use std::fmt;

use rand::Rng;
use rand::distr::Alphanumeric;

use crate::error::AuthError;
use crate::password;

/// Length of an API key in characters.
pub const API_KEY_LEN: usize = 16;
/// Length of an API password in characters.
pub const API_PASSWORD_LEN: usize = 32;
/// Length of a generated database-principal password.
pub const PRINCIPAL_SECRET_LEN: usize = 32;

/// A freshly issued credential pair. The plaintext password exists only
/// in this value and is handed to the caller once.
#[derive(Clone)]
pub struct IssuedCredentials {
    pub api_key: String,
    pub api_password: String,
    pub api_password_hash: String,
}

impl fmt::Debug for IssuedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedCredentials")
            .field("api_key", &self.api_key)
            .field("api_password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Issues API key/password pairs and database-principal secrets.
#[derive(Debug, Clone, Default)]
pub struct CredentialIssuer {
    pepper: Option<String>,
}

impl CredentialIssuer {
    pub fn new(pepper: Option<String>) -> Self {
        Self { pepper }
    }

    /// Generate a key/password pair and hash the password.
    pub fn issue_pair(&self) -> Result<IssuedCredentials, AuthError> {
        let api_key = random_alphanumeric(API_KEY_LEN);
        let api_password = random_alphanumeric(API_PASSWORD_LEN);
        let api_password_hash = password::hash_password(&api_password, self.pepper.as_deref())?;
        Ok(IssuedCredentials {
            api_key,
            api_password,
            api_password_hash,
        })
    }

    /// Verify an API password against its stored hash.
    pub fn verify(&self, api_password: &str, hash: &str) -> Result<bool, AuthError> {
        password::verify_password(api_password, hash, self.pepper.as_deref())
    }

    /// Password for a brand's dedicated database principal.
    pub fn generate_principal_secret(&self) -> String {
        random_alphanumeric(PRINCIPAL_SECRET_LEN)
    }
}

fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
