//! JWT issuance and verification for the two authentication contexts.
//!
//! Principal tokens describe a system-level account and carry no brand
//! claims. Brand tokens are scoped to one brand namespace. The
//! `token_type` claim tells them apart; the claim names below are a wire
//! contract between issuer and resolver.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use brandhub_core::models::brand_user::BrandRole;
use brandhub_core::models::principal::PrincipalRole;

use crate::config::AuthConfig;
use crate::error::AuthError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TokenType {
    Principal,
    Brand,
}

/// Claims of a Principal token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalClaims {
    /// Principal id.
    pub sub: String,
    pub email: String,
    pub roles: Vec<PrincipalRole>,
    pub token_type: TokenType,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Claims of a Brand token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandClaims {
    /// Brand-user id inside the brand namespace.
    pub sub: String,
    pub tenant_id: String,
    pub tenant_schema: String,
    pub roles: Vec<BrandRole>,
    pub token_type: TokenType,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Claims as accepted from the wire, before they are sorted into one of
/// the two identity shapes.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    /// Absent on tokens minted before brand tokens existed; read as
    /// Principal.
    #[serde(default)]
    pub token_type: Option<TokenType>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "brand_id")]
    pub tenant_id: Option<String>,
    #[serde(default, alias = "brand_schema")]
    pub tenant_schema: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub jti: Option<String>,
}

impl TokenClaims {
    pub fn token_type(&self) -> TokenType {
        self.token_type.unwrap_or(TokenType::Principal)
    }
}

fn sign<T: Serialize>(claims: &T, config: &AuthConfig) -> Result<String, AuthError> {
    let key = EncodingKey::from_ed_pem(config.jwt_private_key_pem.as_bytes())
        .map_err(|e| AuthError::Crypto(format!("bad private key: {e}")))?;

    let header = Header::new(Algorithm::EdDSA);
    jsonwebtoken::encode(&header, claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

/// `now` plus the configured lifetime, refusing lifetimes that overflow.
fn expires_at(now: i64, config: &AuthConfig) -> Result<i64, AuthError> {
    i64::try_from(config.token_lifetime_secs)
        .ok()
        .and_then(|ttl| now.checked_add(ttl))
        .ok_or_else(|| {
            AuthError::Crypto(format!(
                "token lifetime {}s is out of range",
                config.token_lifetime_secs
            ))
        })
}

/// Issue a signed EdDSA Principal token.
pub fn issue_principal_token(
    principal_id: Uuid,
    email: &str,
    roles: &[PrincipalRole],
    config: &AuthConfig,
) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = PrincipalClaims {
        sub: principal_id.to_string(),
        email: email.to_string(),
        roles: roles.to_vec(),
        token_type: TokenType::Principal,
        iss: config.jwt_issuer.clone(),
        iat: now,
        exp: expires_at(now, config)?,
        jti: Uuid::new_v4().to_string(),
    };
    sign(&claims, config)
}

/// Issue a signed EdDSA Brand token.
pub fn issue_brand_token(
    user_id: Uuid,
    brand_id: Uuid,
    namespace: &str,
    roles: &[BrandRole],
    config: &AuthConfig,
) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = BrandClaims {
        sub: user_id.to_string(),
        tenant_id: brand_id.to_string(),
        tenant_schema: namespace.to_string(),
        roles: roles.to_vec(),
        token_type: TokenType::Brand,
        iss: config.jwt_issuer.clone(),
        iat: now,
        exp: expires_at(now, config)?,
        jti: Uuid::new_v4().to_string(),
    };
    sign(&claims, config)
}

/// Decode and verify a token of either type (signature, expiry, issuer).
pub fn decode_token(token: &str, config: &AuthConfig) -> Result<TokenClaims, AuthError> {
    let key = DecodingKey::from_ed_pem(config.jwt_public_key_pem.as_bytes())
        .map_err(|e| AuthError::Crypto(format!("bad public key: {e}")))?;

    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);
    validation.leeway = 0;

    jsonwebtoken::decode::<TokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })
}
