//! The operation contracts exposed to the transport layer.
//!
//! Every operation takes the request [`Identity`] explicitly and checks
//! the shape it needs before touching storage. Mutations answer with a
//! [`MutationResponse`]; queries with `Result<T, ApiError>`. Neither ever
//! carries internal error text.

use std::fmt;
use std::sync::Arc;

use brandhub_auth::config::AuthConfig;
use brandhub_auth::credentials::CredentialIssuer;
use brandhub_auth::password;
use brandhub_auth::resolver::AuthContextResolver;
use brandhub_auth::service::{AuthContextIssuer, IssuedToken};
use brandhub_auth::vault::SecretVault;
use brandhub_core::error::{BrandError, BrandResult, ErrorKind};
use brandhub_core::identity::{BrandIdentity, Identity};
use brandhub_core::models::brand::{Brand, deletion_phrase};
use brandhub_core::models::brand_user::BrandRole;
use brandhub_core::models::principal::{CreatePrincipal, Principal, PrincipalRole};
use brandhub_core::models::store::{StoreEntry, StoreKind};
use brandhub_core::repository::{
    BrandRepository, BrandStoreRepository, PaginatedResult, Pagination, PrincipalRepository,
};
use brandhub_db::repository::{
    SurrealBrandRepository, SurrealBrandStore, SurrealBrandUserDirectory,
    SurrealPrincipalRepository,
};
use brandhub_db::{
    BrandConnector, BrandProvisioner, CascadeDeletionOrchestrator, CatalogScope, ConnectionRouter,
};
use serde::Serialize;
use surrealdb::{Connection, Surreal};
use tracing::{debug, error, info};
use uuid::Uuid;

/// Outcome of a mutation as seen by a caller.
#[derive(Debug, Clone, Serialize)]
pub struct MutationResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> MutationResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            error_kind: None,
            data: Some(data),
        }
    }

    pub fn failed(err: &BrandError) -> Self {
        Self {
            success: false,
            message: err.public_message(),
            error_kind: Some(err.kind()),
            data: None,
        }
    }
}

/// Failure of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<BrandError> for ApiError {
    fn from(err: BrandError) -> Self {
        Self {
            kind: err.kind(),
            message: err.public_message(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Returned once from `create_brand`; the password is never shown again.
#[derive(Clone, Serialize)]
pub struct CreatedBrand {
    pub brand_id: Uuid,
    pub namespace: String,
    pub api_key: String,
    pub api_password: String,
}

impl fmt::Debug for CreatedBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreatedBrand")
            .field("brand_id", &self.brand_id)
            .field("namespace", &self.namespace)
            .field("api_key", &self.api_key)
            .field("api_password", &"<redacted>")
            .finish()
    }
}

type Directory<C, K> = SurrealBrandUserDirectory<C, K>;

pub struct BrandOperations<C: Connection, K: BrandConnector<C>> {
    principals: SurrealPrincipalRepository<C>,
    brands: SurrealBrandRepository<C>,
    provisioner: BrandProvisioner<C>,
    cascade: CascadeDeletionOrchestrator<C, K>,
    store: SurrealBrandStore<C, K>,
    issuer: AuthContextIssuer<SurrealPrincipalRepository<C>, Directory<C, K>>,
    resolver: AuthContextResolver,
    router: Arc<ConnectionRouter<C, K>>,
}

impl<C: Connection, K: BrandConnector<C>> BrandOperations<C, K> {
    /// `admin` must be a root-level client sitting in `scope`; brand
    /// sessions are opened through `connector`.
    pub fn new(admin: Surreal<C>, scope: CatalogScope, connector: K, config: AuthConfig) -> Self {
        let router = Arc::new(ConnectionRouter::new(
            SurrealBrandRepository::new(admin.clone()),
            SecretVault::new(config.credential_encryption_key),
            connector,
            scope.namespace.clone(),
        ));
        Self {
            principals: SurrealPrincipalRepository::with_pepper(
                admin.clone(),
                config.pepper.clone(),
            ),
            brands: SurrealBrandRepository::new(admin.clone()),
            provisioner: BrandProvisioner::new(
                admin.clone(),
                scope.clone(),
                CredentialIssuer::new(config.pepper.clone()),
                SecretVault::new(config.credential_encryption_key),
            ),
            cascade: CascadeDeletionOrchestrator::new(admin.clone(), scope, Arc::clone(&router)),
            store: SurrealBrandStore::new(Arc::clone(&router)),
            issuer: AuthContextIssuer::new(
                SurrealPrincipalRepository::with_pepper(admin, config.pepper.clone()),
                SurrealBrandUserDirectory::new(Arc::clone(&router)),
                config.clone(),
            ),
            resolver: AuthContextResolver::new(config),
            router,
        }
    }

    /// Resolve the `Authorization` header of a request.
    pub fn identify(&self, authorization: Option<&str>) -> Identity {
        self.resolver.resolve(authorization)
    }

    pub fn router(&self) -> &ConnectionRouter<C, K> {
        &self.router
    }

    // -----------------------------------------------------------------------
    // Principal account
    // -----------------------------------------------------------------------

    pub async fn register_principal(
        &self,
        email: &str,
        password: &str,
    ) -> MutationResponse<Principal> {
        let result = self.try_register(email, password).await;
        respond("register_principal", result, "account created")
    }

    async fn try_register(&self, email: &str, password: &str) -> BrandResult<Principal> {
        if !email.contains('@') {
            return Err(BrandError::validation("email address is invalid"));
        }
        let min = self.issuer.config().min_password_length;
        if password.chars().count() < min {
            return Err(BrandError::validation(format!(
                "password must be at least {min} characters"
            )));
        }
        self.principals
            .create(CreatePrincipal {
                email: email.into(),
                password: password.into(),
                roles: vec![PrincipalRole::Member],
            })
            .await
    }

    pub async fn sign_in_principal(
        &self,
        email: &str,
        password: &str,
    ) -> MutationResponse<IssuedToken> {
        let result = self.issuer.authenticate_principal(email, password).await;
        respond("sign_in_principal", result, "signed in")
    }

    /// Verify the caller's password, then remove every brand it owns and
    /// the account itself.
    pub async fn delete_principal_account(
        &self,
        identity: &Identity,
        password: &str,
    ) -> MutationResponse<u64> {
        let result = self.try_delete_account(identity, password).await;
        respond("delete_principal_account", result, "account deleted")
    }

    async fn try_delete_account(&self, identity: &Identity, password: &str) -> BrandResult<u64> {
        let caller = identity.require_principal()?;
        let principal = self.principals.get_by_id(caller.principal_id).await?;
        let valid = password::verify_password(
            password,
            &principal.password_hash,
            self.issuer.config().pepper.as_deref(),
        )?;
        if !valid {
            return Err(BrandError::invalid_credentials());
        }
        self.cascade.delete_owner(principal.id).await
    }

    // -----------------------------------------------------------------------
    // Brand lifecycle
    // -----------------------------------------------------------------------

    pub async fn create_brand(
        &self,
        identity: &Identity,
        name: &str,
    ) -> MutationResponse<CreatedBrand> {
        let result = self.try_create_brand(identity, name).await;
        respond("create_brand", result, "brand created")
    }

    async fn try_create_brand(&self, identity: &Identity, name: &str) -> BrandResult<CreatedBrand> {
        let caller = identity.require_principal()?;
        self.principals
            .get_by_id(caller.principal_id)
            .await
            .map_err(stale_principal)?;
        let provisioned = self
            .provisioner
            .create_brand(caller.principal_id, name)
            .await
            .map_err(stale_principal)?;
        Ok(CreatedBrand {
            brand_id: provisioned.brand.id,
            namespace: provisioned.brand.namespace,
            api_key: provisioned.api_key,
            api_password: provisioned.api_password,
        })
    }

    /// Permanently delete a brand. `confirmation` must read
    /// `DELETE <brand_id>`.
    pub async fn delete_brand(
        &self,
        identity: &Identity,
        brand_id: Uuid,
        confirmation: &str,
    ) -> MutationResponse<Uuid> {
        let result = self.try_delete_brand(identity, brand_id, confirmation).await;
        respond("delete_brand", result, "brand deleted")
    }

    async fn try_delete_brand(
        &self,
        identity: &Identity,
        brand_id: Uuid,
        confirmation: &str,
    ) -> BrandResult<Uuid> {
        let caller = identity.require_principal()?;
        let expected = deletion_phrase(brand_id);
        if confirmation != expected {
            return Err(BrandError::validation(format!(
                "confirmation must read \"{expected}\""
            )));
        }
        let brand = self.brands.get_by_id(brand_id).await?;
        if brand.owner_id != caller.principal_id && !caller.is_system_admin() {
            return Err(BrandError::denied("only the owner may delete this brand"));
        }
        self.cascade.delete_brand(brand_id).await?;
        Ok(brand_id)
    }

    pub async fn list_my_brands(
        &self,
        identity: &Identity,
        pagination: Pagination,
    ) -> Result<PaginatedResult<Brand>, ApiError> {
        let caller = identity.require_principal()?;
        Ok(self
            .brands
            .list_by_owner(caller.principal_id, pagination)
            .await?)
    }

    pub async fn authenticate_brand(
        &self,
        brand_id: Uuid,
        api_key: &str,
        api_password: &str,
    ) -> MutationResponse<IssuedToken> {
        let result = self
            .issuer
            .authenticate_brand(brand_id, api_key, api_password)
            .await;
        respond("authenticate_brand", result, "authenticated")
    }

    // -----------------------------------------------------------------------
    // Brand stores
    // -----------------------------------------------------------------------

    pub async fn get_brand_info(&self, identity: &Identity) -> Result<Vec<StoreEntry>, ApiError> {
        let scope = brand_member(identity)?;
        Ok(self.store.entries(scope, StoreKind::Info).await?)
    }

    pub async fn update_brand_info(
        &self,
        identity: &Identity,
        key: &str,
        value: &str,
    ) -> MutationResponse<StoreEntry> {
        let result = match brand_member(identity) {
            Ok(scope) => self.store.put(scope, StoreKind::Info, key, value).await,
            Err(err) => Err(err),
        };
        respond("update_brand_info", result, "brand info updated")
    }

    pub async fn get_brand_config(
        &self,
        identity: &Identity,
    ) -> Result<Vec<StoreEntry>, ApiError> {
        let scope = brand_member(identity)?;
        Ok(self.store.entries(scope, StoreKind::Config).await?)
    }

    pub async fn update_brand_config(
        &self,
        identity: &Identity,
        key: &str,
        value: &str,
    ) -> MutationResponse<StoreEntry> {
        let result = match brand_owner(identity) {
            Ok(scope) => self.store.put(scope, StoreKind::Config, key, value).await,
            Err(err) => Err(err),
        };
        respond("update_brand_config", result, "brand config updated")
    }
}

/// A Brand identity holding either brand role.
fn brand_member(identity: &Identity) -> BrandResult<&BrandIdentity> {
    let scope = identity.require_brand()?;
    if scope.has_role(BrandRole::Owner) || scope.has_role(BrandRole::Operator) {
        Ok(scope)
    } else {
        Err(BrandError::denied("brand role required"))
    }
}

fn brand_owner(identity: &Identity) -> BrandResult<&BrandIdentity> {
    let scope = identity.require_brand()?;
    scope.require_role(BrandRole::Owner)?;
    Ok(scope)
}

/// A token whose principal no longer exists fails authentication.
fn stale_principal(err: BrandError) -> BrandError {
    match err {
        BrandError::NotFound { ref entity, .. } if entity == "principal" => {
            BrandError::invalid_credentials()
        }
        other => other,
    }
}

fn respond<T>(operation: &str, result: BrandResult<T>, message: &str) -> MutationResponse<T> {
    match result {
        Ok(data) => {
            info!(operation, "operation succeeded");
            MutationResponse::ok(message, data)
        }
        Err(err) => {
            if err.kind() == ErrorKind::Infra {
                error!(operation, error = %err, "operation failed");
            } else {
                debug!(operation, error = %err, "operation rejected");
            }
            MutationResponse::failed(&err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_response_hides_infra_detail() {
        let err = BrandError::Database("REMOVE DATABASE failed on node-3".into());
        let response = MutationResponse::<()>::failed(&err);
        assert!(!response.success);
        assert_eq!(response.error_kind, Some(ErrorKind::Infra));
        assert!(!response.message.contains("node-3"));
        assert!(response.data.is_none());
    }

    #[test]
    fn missing_principal_becomes_authentication_failure() {
        let gone = stale_principal(BrandError::NotFound {
            entity: "principal".into(),
            id: Uuid::new_v4().to_string(),
        });
        assert_eq!(gone.kind(), ErrorKind::Authentication);

        let brand = stale_principal(BrandError::NotFound {
            entity: "brand".into(),
            id: Uuid::new_v4().to_string(),
        });
        assert_eq!(brand.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn api_error_carries_kind() {
        let err: ApiError = BrandError::denied("nope").into();
        assert_eq!(err.kind, ErrorKind::Authorization);
        assert_eq!(err.message, "permission denied: nope");
    }

    #[test]
    fn principal_cannot_act_as_brand_member() {
        let identity = Identity::Principal(brandhub_core::identity::PrincipalIdentity {
            principal_id: Uuid::new_v4(),
            email: "owner@example.com".into(),
            roles: vec![PrincipalRole::Member],
        });
        let err = brand_member(&identity).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn created_brand_debug_redacts_password() {
        let created = CreatedBrand {
            brand_id: Uuid::new_v4(),
            namespace: "brand_x".into(),
            api_key: "k".repeat(16),
            api_password: "very-secret-password".into(),
        };
        assert!(!format!("{created:?}").contains("very-secret-password"));
    }
}
