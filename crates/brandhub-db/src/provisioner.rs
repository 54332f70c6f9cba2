//! Brand provisioning as a compensated saga.
//!
//! SurrealDB does not run `DEFINE DATABASE` / `DEFINE USER` inside a
//! transaction, so each step is applied on its own and paired with a
//! compensating action. When a step fails, every step that ran (the
//! failing one included, unless it failed on a conflict) is undone in
//! reverse order. A compensation that fails leaves an orphan behind and
//! is logged at `error` with `orphaned = true`.

use std::fmt;

use brandhub_auth::credentials::CredentialIssuer;
use brandhub_auth::vault::SecretVault;
use brandhub_core::error::{BrandError, BrandResult};
use brandhub_core::models::brand::{Brand, ReserveBrand, validate_brand_name};
use brandhub_core::models::brand_user::BrandRole;
use brandhub_core::models::store::{BRAND_NAME_KEY, StoreKind};
use brandhub_core::repository::BrandRepository;
use surrealdb::{Connection, Surreal};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::connection::CatalogScope;
use crate::ddl;
use crate::error::DbError;
use crate::repository::SurrealBrandRepository;

/// The forward actions of [`BrandProvisioner::create_brand`], in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ReserveCatalog,
    DefineDatabase,
    DefinePrincipal,
    DefineTables,
    SeedOwner,
    Activate,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::ReserveCatalog,
        Step::DefineDatabase,
        Step::DefinePrincipal,
        Step::DefineTables,
        Step::SeedOwner,
        Step::Activate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::ReserveCatalog => "reserve_catalog",
            Step::DefineDatabase => "define_database",
            Step::DefinePrincipal => "define_principal",
            Step::DefineTables => "define_tables",
            Step::SeedOwner => "seed_owner",
            Step::Activate => "activate",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a failed step.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("validation: {0}")]
    Validation(String),
    #[error("{0} already exists")]
    Conflict(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },
    #[error("infrastructure: {0}")]
    Infra(String),
}

impl From<BrandError> for StepError {
    fn from(err: BrandError) -> Self {
        match err {
            BrandError::Validation { message } => StepError::Validation(message),
            BrandError::Conflict { entity } => StepError::Conflict(entity),
            BrandError::NotFound { entity, id } => StepError::NotFound { entity, id },
            other => StepError::Infra(other.to_string()),
        }
    }
}

impl From<DbError> for StepError {
    fn from(err: DbError) -> Self {
        BrandError::from(err).into()
    }
}

impl From<StepError> for BrandError {
    fn from(err: StepError) -> Self {
        match err {
            StepError::Validation(message) => BrandError::Validation { message },
            StepError::Conflict(entity) => BrandError::Conflict { entity },
            StepError::NotFound { entity, id } => BrandError::NotFound { entity, id },
            StepError::Infra(message) => BrandError::Database(message),
        }
    }
}

/// A newly provisioned brand and its owner credentials.
///
/// The API password is never stored in plaintext; this value is the only
/// place it exists.
pub struct ProvisionedBrand {
    pub brand: Brand,
    pub owner_user_id: Uuid,
    pub api_key: String,
    pub api_password: String,
}

impl fmt::Debug for ProvisionedBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionedBrand")
            .field("brand", &self.brand)
            .field("owner_user_id", &self.owner_user_id)
            .field("api_key", &self.api_key)
            .field("api_password", &"<redacted>")
            .finish()
    }
}

/// Bookkeeping for one saga run.
struct Saga {
    reserve: ReserveBrand,
    principal_secret: String,
    brand: Option<Brand>,
    owner: Option<(Uuid, String, String)>,
}

/// Creates brand databases, their principals, tables and owner users.
pub struct BrandProvisioner<C: Connection> {
    admin: Surreal<C>,
    scope: CatalogScope,
    brands: SurrealBrandRepository<C>,
    credentials: CredentialIssuer,
    vault: SecretVault,
    #[cfg(test)]
    fail_at: Option<Step>,
}

impl<C: Connection> BrandProvisioner<C> {
    /// `admin` must be a root-level client sitting in `scope`.
    pub fn new(
        admin: Surreal<C>,
        scope: CatalogScope,
        credentials: CredentialIssuer,
        vault: SecretVault,
    ) -> Self {
        Self {
            brands: SurrealBrandRepository::new(admin.clone()),
            admin,
            scope,
            credentials,
            vault,
            #[cfg(test)]
            fail_at: None,
        }
    }

    /// Provision a brand for `owner_id`.
    ///
    /// Display names need not be unique; the namespace is derived from a
    /// fresh id. Either every step succeeds or none of them is left
    /// applied.
    pub async fn create_brand(
        &self,
        owner_id: Uuid,
        requested_name: &str,
    ) -> BrandResult<ProvisionedBrand> {
        let name = validate_brand_name(requested_name)?;

        let principal_secret = self.credentials.generate_principal_secret();
        let sealed = self.vault.seal(principal_secret.as_bytes())?;
        let mut saga = Saga {
            reserve: ReserveBrand::new(owner_id, name, sealed),
            principal_secret,
            brand: None,
            owner: None,
        };
        let brand_id = saga.reserve.id;
        let namespace = saga.reserve.namespace.clone();
        info!(%brand_id, %owner_id, %namespace, "provisioning brand");

        let mut applied: Vec<Step> = Vec::with_capacity(Step::ALL.len());
        for step in Step::ALL {
            debug!(%brand_id, %step, "running step");
            match self.run(step, &mut saga).await {
                Ok(()) => applied.push(step),
                Err(err) => {
                    warn!(%brand_id, %namespace, %step, error = %err, "provisioning step failed");
                    // A rejected step wrote nothing that needs undoing.
                    if !matches!(err, StepError::Conflict(_) | StepError::NotFound { .. }) {
                        applied.push(step);
                    }
                    self.compensate(&applied, &saga).await;
                    return Err(err.into());
                }
            }
        }

        let (Some(brand), Some((owner_user_id, api_key, api_password))) = (saga.brand, saga.owner)
        else {
            return Err(BrandError::Internal(
                "saga completed without a brand or owner".into(),
            ));
        };

        info!(%brand_id, %namespace, "brand provisioned");
        Ok(ProvisionedBrand {
            brand,
            owner_user_id,
            api_key,
            api_password,
        })
    }

    async fn run(&self, step: Step, saga: &mut Saga) -> Result<(), StepError> {
        let namespace = saga.reserve.namespace.clone();
        match step {
            Step::ReserveCatalog => {
                saga.brand = Some(self.brands.reserve(saga.reserve.clone()).await?);
            }
            Step::DefineDatabase => {
                ddl::define_database(&self.admin, &namespace).await?;
            }
            Step::DefinePrincipal => {
                ddl::define_principal(
                    &self.admin,
                    &self.scope,
                    &namespace,
                    &saga.reserve.db_principal,
                    &saga.principal_secret,
                )
                .await?;
            }
            Step::DefineTables => {
                ddl::define_tables(&self.admin, &self.scope, &namespace).await?;
            }
            Step::SeedOwner => {
                let issued = self.credentials.issue_pair().map_err(BrandError::from)?;
                let user_id = Uuid::new_v4();
                // Recorded before the write so a partial seed is cleaned up.
                saga.owner = Some((user_id, issued.api_key.clone(), issued.api_password));
                self.seed_owner(
                    &namespace,
                    user_id,
                    &issued.api_key,
                    issued.api_password_hash,
                    &saga.reserve.name,
                )
                .await?;
            }
            Step::Activate => {
                saga.brand = Some(self.brands.activate(saga.reserve.id).await?);
            }
        }

        #[cfg(test)]
        if self.fail_at == Some(step) {
            return Err(StepError::Infra(format!("injected failure after {step}")));
        }

        Ok(())
    }

    async fn seed_owner(
        &self,
        namespace: &str,
        user_id: Uuid,
        api_key: &str,
        api_password_hash: String,
        brand_name: &str,
    ) -> Result<(), DbError> {
        let statement = format!(
            "CREATE type::record('brand_user', $user_id) SET \
                 api_key = $api_key, api_password_hash = $api_password_hash, \
                 name = $user_name, active = true;\n\
             CREATE brand_user_role SET user_id = $user_id, role = $role;\n\
             UPSERT type::record('{info}', $info_key) SET \
                 key = $info_key, value = $brand_name;",
            info = StoreKind::Info.table(),
        );
        self.admin
            .query(self.scope.wrap(namespace, &statement)?)
            .bind(("user_id", user_id.to_string()))
            .bind(("api_key", api_key.to_string()))
            .bind(("api_password_hash", api_password_hash))
            .bind(("user_name", "Owner".to_string()))
            .bind(("role", BrandRole::Owner.as_str().to_string()))
            .bind(("info_key", BRAND_NAME_KEY.to_string()))
            .bind(("brand_name", brand_name.to_string()))
            .await?
            .check()
            .map_err(|e| DbError::from_statement("brand user", e))?;
        Ok(())
    }

    async fn compensate(&self, applied: &[Step], saga: &Saga) {
        let brand_id = saga.reserve.id;
        let namespace = &saga.reserve.namespace;
        let principal = &saga.reserve.db_principal;

        for step in applied.iter().rev() {
            let outcome: Result<(), BrandError> = match step {
                Step::Activate => self.brands.deactivate(brand_id).await.map(|_| ()),
                Step::SeedOwner => self.unseed(namespace).await.map_err(Into::into),
                Step::DefineTables => ddl::remove_tables(&self.admin, &self.scope, namespace)
                    .await
                    .map_err(Into::into),
                Step::DefinePrincipal => {
                    ddl::remove_principal(&self.admin, &self.scope, namespace, principal)
                        .await
                        .map_err(Into::into)
                }
                Step::DefineDatabase => ddl::remove_database(&self.admin, namespace)
                    .await
                    .map_err(Into::into),
                Step::ReserveCatalog => self.brands.delete(brand_id).await,
            };

            match outcome {
                Ok(()) => debug!(%brand_id, %step, "step compensated"),
                Err(err) => error!(
                    orphaned = true,
                    %brand_id,
                    %namespace,
                    %principal,
                    %step,
                    error = %err,
                    "compensation failed; manual cleanup required"
                ),
            }
        }
    }

    async fn unseed(&self, namespace: &str) -> Result<(), DbError> {
        let statement = format!(
            "DELETE brand_user;\nDELETE brand_user_role;\nDELETE {};",
            StoreKind::Info.table()
        );
        self.admin
            .query(self.scope.wrap(namespace, &statement)?)
            .await?
            .check()?;
        Ok(())
    }

    /// Tables present in `brand`'s database.
    pub async fn brand_tables(&self, brand: &Brand) -> BrandResult<Vec<String>> {
        Ok(ddl::list_tables(&self.admin, &self.scope, &brand.namespace).await?)
    }

    /// All databases in the system namespace, the catalog included.
    pub async fn databases(&self) -> BrandResult<Vec<String>> {
        Ok(ddl::list_databases(&self.admin).await?)
    }
}

#[cfg(test)]
mod tests {
    use brandhub_core::models::principal::CreatePrincipal;
    use brandhub_core::repository::{Pagination, PrincipalRepository};
    use surrealdb::engine::local::{Db, Mem};
    use surrealdb_types::SurrealValue;

    use super::*;
    use crate::repository::SurrealPrincipalRepository;

    async fn setup() -> (Surreal<Db>, BrandProvisioner<Db>, Uuid) {
        let db = Surreal::new::<Mem>(()).await.unwrap();
        db.query("DEFINE NAMESPACE test; USE NS test; DEFINE DATABASE catalog;")
            .await
            .unwrap()
            .check()
            .unwrap();
        db.use_ns("test").use_db("catalog").await.unwrap();
        crate::run_migrations(&db).await.unwrap();

        let provisioner = BrandProvisioner::new(
            db.clone(),
            CatalogScope::new("test", "catalog"),
            CredentialIssuer::default(),
            SecretVault::new([9u8; 32]),
        );
        let owner = SurrealPrincipalRepository::new(db.clone())
            .create(CreatePrincipal {
                email: "owner@example.com".into(),
                password: "correct-horse-battery".into(),
                roles: vec![],
            })
            .await
            .unwrap()
            .id;
        (db, provisioner, owner)
    }

    async fn assert_nothing_left(db: &Surreal<Db>, provisioner: &BrandProvisioner<Db>, owner: Uuid) {
        let brands = SurrealBrandRepository::new(db.clone())
            .list_by_owner(owner, Pagination::default())
            .await
            .unwrap();
        assert!(brands.items.is_empty(), "catalog row left behind");
        assert_eq!(provisioner.databases().await.unwrap(), vec!["catalog".to_string()]);
    }

    #[tokio::test]
    async fn failure_after_each_step_rolls_back() {
        for step in Step::ALL {
            let (db, mut provisioner, owner) = setup().await;
            provisioner.fail_at = Some(step);

            let err = provisioner.create_brand(owner, "Acme").await.unwrap_err();
            assert!(matches!(err, BrandError::Database(_)), "{step}: {err}");
            assert_nothing_left(&db, &provisioner, owner).await;
        }
    }

    #[tokio::test]
    async fn rollback_keeps_ledger_entry() {
        let (db, mut provisioner, owner) = setup().await;
        provisioner.fail_at = Some(Step::DefineTables);

        provisioner
            .create_brand(owner, "Acme")
            .await
            .unwrap_err();

        #[derive(Debug, SurrealValue)]
        struct CountRow {
            total: u64,
        }
        let mut result = db
            .query("SELECT count() AS total FROM namespace_ledger GROUP ALL")
            .await
            .unwrap();
        let rows: Vec<CountRow> = result.take(0).unwrap();
        assert_eq!(rows.first().map(|r| r.total), Some(1));
    }

    #[tokio::test]
    async fn invalid_name_has_no_side_effects() {
        let (db, provisioner, owner) = setup().await;

        let err = provisioner.create_brand(owner, "   ").await.unwrap_err();
        assert!(matches!(err, BrandError::Validation { .. }));
        assert_nothing_left(&db, &provisioner, owner).await;
    }

    #[tokio::test]
    async fn successful_run_creates_all_tables() {
        let (_db, provisioner, owner) = setup().await;
        let provisioned = provisioner
            .create_brand(owner, "Acme")
            .await
            .unwrap();

        assert!(provisioned.brand.active);
        assert_eq!(provisioned.api_key.len(), 16);
        assert_eq!(provisioned.api_password.len(), 32);
        assert!(!format!("{provisioned:?}").contains(&provisioned.api_password));
        assert_eq!(
            provisioner.brand_tables(&provisioned.brand).await.unwrap(),
            vec!["brand_config", "brand_info", "brand_user", "brand_user_role"]
        );
    }

    #[tokio::test]
    async fn unknown_owner_is_refused_without_side_effects() {
        let (db, provisioner, _owner) = setup().await;
        let ghost = Uuid::new_v4();

        let err = provisioner.create_brand(ghost, "Ghost").await.unwrap_err();
        assert!(
            matches!(err, BrandError::NotFound { ref entity, .. } if entity == "principal"),
            "{err}"
        );
        assert_nothing_left(&db, &provisioner, ghost).await;
    }
}
