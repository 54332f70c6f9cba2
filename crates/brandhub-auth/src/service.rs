//! Token issuance for the Principal and Brand contexts.

use brandhub_core::error::{BrandError, BrandResult};
use brandhub_core::models::principal::{Principal, normalize_email};
use brandhub_core::repository::{BrandUserDirectory, PrincipalRepository};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::credentials::CredentialIssuer;
use crate::error::AuthError;
use crate::password;
use crate::token::{self, TokenType};

/// A signed token handed to a client.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub token_type: TokenType,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

/// Mints Principal and Brand tokens.
///
/// Generic over repository implementations so that the auth layer has
/// no dependency on the database crate.
pub struct AuthContextIssuer<P: PrincipalRepository, D: BrandUserDirectory> {
    principal_repo: P,
    brand_users: D,
    credentials: CredentialIssuer,
    config: AuthConfig,
}

impl<P: PrincipalRepository, D: BrandUserDirectory> AuthContextIssuer<P, D> {
    pub fn new(principal_repo: P, brand_users: D, config: AuthConfig) -> Self {
        Self {
            principal_repo,
            brand_users,
            credentials: CredentialIssuer::new(config.pepper.clone()),
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Mint a Principal token. Carries no brand claims.
    pub fn issue_principal_token(&self, principal: &Principal) -> BrandResult<IssuedToken> {
        let token = token::issue_principal_token(
            principal.id,
            &principal.email,
            &principal.roles,
            &self.config,
        )?;
        Ok(IssuedToken {
            token,
            token_type: TokenType::Principal,
            expires_in: self.config.token_lifetime_secs,
        })
    }

    /// Email/password sign-in for a Principal.
    pub async fn authenticate_principal(
        &self,
        email: &str,
        password: &str,
    ) -> BrandResult<IssuedToken> {
        let principal = match self.principal_repo.get_by_email(&normalize_email(email)).await {
            Ok(p) => p,
            Err(BrandError::NotFound { .. }) => {
                password::verify_missing_account(password, self.config.pepper.as_deref());
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        let valid = password::verify_password(
            password,
            &principal.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            debug!(principal_id = %principal.id, "principal password mismatch");
            return Err(AuthError::InvalidCredentials.into());
        }

        info!(principal_id = %principal.id, "principal signed in");
        self.issue_principal_token(&principal)
    }

    /// Verify brand API credentials and mint a Brand token.
    ///
    /// Unknown brand, unknown key, inactive user and wrong password all
    /// fail with the same authentication error.
    pub async fn authenticate_brand(
        &self,
        brand_id: Uuid,
        api_key: &str,
        api_password: &str,
    ) -> BrandResult<IssuedToken> {
        // 1. Resolve the brand namespace and find the user by API key.
        let scoped = match self.brand_users.find_by_api_key(brand_id, api_key).await {
            Ok(found) => found,
            Err(BrandError::NotFound { .. }) => {
                debug!(%brand_id, "brand or api key not found");
                password::verify_missing_account(api_password, self.config.pepper.as_deref());
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        // 2. Verify password.
        let valid = self
            .credentials
            .verify(api_password, &scoped.user.api_password_hash)?;
        if !valid {
            debug!(%brand_id, user_id = %scoped.user.id, "brand password mismatch");
            return Err(AuthError::InvalidCredentials.into());
        }

        // 3. Check account status.
        if !scoped.user.active {
            return Err(AuthError::AccountInactive.into());
        }

        // 4. Issue the brand-scoped token.
        let token = token::issue_brand_token(
            scoped.user.id,
            scoped.brand_id,
            &scoped.namespace,
            &scoped.user.roles,
            &self.config,
        )?;

        info!(%brand_id, user_id = %scoped.user.id, "brand user signed in");
        Ok(IssuedToken {
            token,
            token_type: TokenType::Brand,
            expires_in: self.config.token_lifetime_secs,
        })
    }
}
