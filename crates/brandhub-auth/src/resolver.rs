//! Request-level authentication: token in, [`Identity`] out.
//!
//! Purely stateless. No database lookup is performed; the only shared
//! state is the verification key in [`AuthConfig`].

use std::str::FromStr;

use brandhub_core::identity::{BrandIdentity, Identity, PrincipalIdentity};
use brandhub_core::models::brand_user::BrandRole;
use brandhub_core::models::principal::PrincipalRole;
use tracing::debug;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::token::{self, TokenClaims, TokenType};

#[derive(Debug, Clone)]
pub struct AuthContextResolver {
    config: AuthConfig,
}

impl AuthContextResolver {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Resolve the value of an `Authorization` header.
    ///
    /// A missing header, a non-bearer scheme, or any token failure
    /// yields [`Identity::Anonymous`].
    pub fn resolve(&self, authorization: Option<&str>) -> Identity {
        let Some(token) = authorization.and_then(bearer_token) else {
            return Identity::Anonymous;
        };
        match self.resolve_token(token) {
            Ok(identity) => identity,
            Err(e) => {
                debug!(error = %e, "rejected bearer token");
                Identity::Anonymous
            }
        }
    }

    /// Verify a raw token and hydrate the identity its claims describe.
    pub fn resolve_token(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = token::decode_token(token, &self.config)?;
        match claims.token_type() {
            TokenType::Principal => principal_identity(&claims).map(Identity::Principal),
            TokenType::Brand => brand_identity(&claims).map(Identity::Brand),
        }
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn parse_uuid(value: &str, claim: &str) -> Result<Uuid, AuthError> {
    Uuid::parse_str(value).map_err(|e| AuthError::TokenInvalid(format!("bad {claim} claim: {e}")))
}

fn parse_roles<R: FromStr<Err = String>>(roles: &[String]) -> Result<Vec<R>, AuthError> {
    roles
        .iter()
        .map(|r| R::from_str(r).map_err(AuthError::TokenInvalid))
        .collect()
}

fn principal_identity(claims: &TokenClaims) -> Result<PrincipalIdentity, AuthError> {
    if claims.tenant_id.is_some() || claims.tenant_schema.is_some() {
        return Err(AuthError::TokenInvalid(
            "principal token carries brand claims".into(),
        ));
    }
    Ok(PrincipalIdentity {
        principal_id: parse_uuid(&claims.sub, "sub")?,
        email: claims.email.clone().unwrap_or_default(),
        roles: parse_roles::<PrincipalRole>(&claims.roles)?,
    })
}

fn brand_identity(claims: &TokenClaims) -> Result<BrandIdentity, AuthError> {
    let brand_id = claims
        .tenant_id
        .as_deref()
        .ok_or_else(|| AuthError::TokenInvalid("brand token without tenant_id".into()))?;
    let namespace = claims
        .tenant_schema
        .clone()
        .ok_or_else(|| AuthError::TokenInvalid("brand token without tenant_schema".into()))?;
    Ok(BrandIdentity {
        brand_id: parse_uuid(brand_id, "tenant_id")?,
        namespace,
        user_id: parse_uuid(&claims.sub, "sub")?,
        roles: parse_roles::<BrandRole>(&claims.roles)?,
    })
}
