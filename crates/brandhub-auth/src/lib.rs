//! BrandHub Auth: credential issuance, secret sealing, and the two
//! token contexts (Principal and Brand).

pub mod config;
pub mod credentials;
pub mod error;
pub mod password;
pub mod resolver;
pub mod service;
pub mod token;
pub mod vault;

pub use config::AuthConfig;
pub use credentials::{CredentialIssuer, IssuedCredentials};
pub use error::AuthError;
pub use resolver::AuthContextResolver;
pub use service::{AuthContextIssuer, IssuedToken};
pub use token::{TokenClaims, TokenType};
pub use vault::SecretVault;
