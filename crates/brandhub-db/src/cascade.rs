//! Permanent deletion of brands and of principals with their brands.

use std::sync::Arc;

use brandhub_core::error::{BrandError, BrandResult};
use brandhub_core::repository::{BrandRepository, Pagination, PrincipalRepository};
use surrealdb::{Connection, Surreal};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::connection::{BrandConnector, CatalogScope};
use crate::ddl;
use crate::error::DbError;
use crate::repository::{SurrealBrandRepository, SurrealPrincipalRepository};
use crate::router::ConnectionRouter;

/// Page size used while draining an owner's brands.
const DRAIN_BATCH: u64 = 50;

/// Drain passes before owner deletion gives up on a racing creator.
const DRAIN_ROUNDS: usize = 3;

pub struct CascadeDeletionOrchestrator<C: Connection, K: BrandConnector<C>> {
    admin: Surreal<C>,
    scope: CatalogScope,
    brands: SurrealBrandRepository<C>,
    principals: SurrealPrincipalRepository<C>,
    router: Arc<ConnectionRouter<C, K>>,
    #[cfg(test)]
    fail_drop: bool,
}

impl<C: Connection, K: BrandConnector<C>> CascadeDeletionOrchestrator<C, K> {
    /// `admin` must be a root-level client sitting in `scope`.
    pub fn new(admin: Surreal<C>, scope: CatalogScope, router: Arc<ConnectionRouter<C, K>>) -> Self {
        Self {
            brands: SurrealBrandRepository::new(admin.clone()),
            principals: SurrealPrincipalRepository::new(admin.clone()),
            admin,
            scope,
            router,
            #[cfg(test)]
            fail_drop: false,
        }
    }

    /// Drop a brand's principal and database, then its catalog row.
    ///
    /// The row is deactivated and the router entry revoked before anything
    /// is dropped. If a drop fails the row stays, inactive, so the brand is
    /// unusable and the deletion can be retried.
    pub async fn delete_brand(&self, brand_id: Uuid) -> BrandResult<()> {
        let brand = self.brands.get_by_id(brand_id).await?;
        info!(%brand_id, namespace = %brand.namespace, "deleting brand");

        self.brands.deactivate(brand_id).await?;
        self.router.invalidate(brand_id);

        if let Err(err) = self.drop_brand_objects(&brand.namespace, &brand.db_principal).await {
            error!(
                %brand_id,
                namespace = %brand.namespace,
                principal = %brand.db_principal,
                error = %err,
                "brand drop failed; catalog row kept inactive"
            );
            return Err(BrandError::Database(format!(
                "failed to drop brand {brand_id}: {err}"
            )));
        }

        self.brands.delete(brand_id).await?;
        // The catalog row is gone, so resolution fails on NotFound from here on.
        self.router.forget(brand_id);
        info!(%brand_id, "brand deleted");
        Ok(())
    }

    async fn drop_brand_objects(&self, namespace: &str, principal: &str) -> Result<(), DbError> {
        #[cfg(test)]
        if self.fail_drop {
            return Err(DbError::Query("injected drop failure".into()));
        }

        ddl::remove_principal(&self.admin, &self.scope, namespace, principal).await?;
        ddl::remove_database(&self.admin, namespace).await
    }

    /// Delete every brand owned by `owner_id`, then the principal.
    ///
    /// The first failing brand aborts the operation and the principal is
    /// kept, so no brand is ever left without its owner. Returns the
    /// number of brands deleted.
    pub async fn delete_owner(&self, owner_id: Uuid) -> BrandResult<u64> {
        self.principals.get_by_id(owner_id).await?;
        info!(%owner_id, "deleting owner and owned brands");

        let mut deleted = 0;
        for _ in 0..DRAIN_ROUNDS {
            deleted += self.drain_owner(owner_id).await?;
            if self.delete_principal_if_unowned(owner_id).await? {
                info!(%owner_id, brands = deleted, "owner deleted");
                return Ok(deleted);
            }
            warn!(%owner_id, "brand created during owner deletion; draining again");
        }

        Err(BrandError::Conflict {
            entity: "principal".into(),
        })
    }

    async fn drain_owner(&self, owner_id: Uuid) -> BrandResult<u64> {
        let mut deleted = 0;
        loop {
            let page = self
                .brands
                .list_by_owner(
                    owner_id,
                    Pagination {
                        offset: 0,
                        limit: DRAIN_BATCH,
                    },
                )
                .await?;
            if page.items.is_empty() {
                return Ok(deleted);
            }
            for brand in page.items {
                if let Err(err) = self.delete_brand(brand.id).await {
                    warn!(
                        %owner_id,
                        brand_id = %brand.id,
                        error = %err,
                        "owner deletion aborted; principal kept"
                    );
                    return Err(err);
                }
                deleted += 1;
            }
        }
    }

    /// Delete the principal only while no brand row names it as owner.
    /// Returns false when a brand appeared after the drain.
    async fn delete_principal_if_unowned(&self, owner_id: Uuid) -> BrandResult<bool> {
        let mut result = self
            .admin
            .query(
                "IF array::len((SELECT VALUE id FROM brand WHERE owner_id = $owner_id LIMIT 1)) = 0 { \
                    DELETE type::record('principal', $owner_id); true \
                 } ELSE { false }",
            )
            .bind(("owner_id", owner_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("principal", e))?;

        let removed: Option<bool> = result.take(0).map_err(DbError::from)?;
        Ok(removed.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use brandhub_auth::credentials::CredentialIssuer;
    use brandhub_auth::vault::SecretVault;
    use brandhub_core::models::principal::{CreatePrincipal, PrincipalRole};
    use surrealdb::engine::local::{Db, Mem};

    use super::*;
    use crate::connection::SharedBrandConnector;
    use crate::provisioner::BrandProvisioner;

    const KEY: [u8; 32] = [5u8; 32];

    struct Fixture {
        provisioner: BrandProvisioner<Db>,
        cascade: CascadeDeletionOrchestrator<Db, SharedBrandConnector<Db>>,
        brands: SurrealBrandRepository<Db>,
        owner: Uuid,
    }

    async fn setup() -> Fixture {
        let db = Surreal::new::<Mem>(()).await.unwrap();
        db.query("DEFINE NAMESPACE test; USE NS test; DEFINE DATABASE catalog;")
            .await
            .unwrap()
            .check()
            .unwrap();
        db.use_ns("test").use_db("catalog").await.unwrap();
        crate::run_migrations(&db).await.unwrap();

        let scope = CatalogScope::new("test", "catalog");
        let router = Arc::new(ConnectionRouter::new(
            SurrealBrandRepository::new(db.clone()),
            SecretVault::new(KEY),
            SharedBrandConnector::new(db.clone(), scope.clone()),
            "test",
        ));
        let owner = SurrealPrincipalRepository::new(db.clone())
            .create(CreatePrincipal {
                email: "owner@example.com".into(),
                password: "correct-horse-battery".into(),
                roles: vec![PrincipalRole::Member],
            })
            .await
            .unwrap()
            .id;

        Fixture {
            provisioner: BrandProvisioner::new(
                db.clone(),
                scope.clone(),
                CredentialIssuer::default(),
                SecretVault::new(KEY),
            ),
            cascade: CascadeDeletionOrchestrator::new(db.clone(), scope, router),
            brands: SurrealBrandRepository::new(db),
            owner,
        }
    }

    #[tokio::test]
    async fn failed_drop_keeps_inactive_row() {
        let mut f = setup().await;
        let brand = f.provisioner.create_brand(f.owner, "Acme").await.unwrap().brand;

        f.cascade.fail_drop = true;
        let err = f.cascade.delete_brand(brand.id).await.unwrap_err();
        assert!(matches!(err, BrandError::Database(_)));

        let row = f.brands.get_by_id(brand.id).await.unwrap();
        assert!(!row.active);

        f.cascade.fail_drop = false;
        f.cascade.delete_brand(brand.id).await.unwrap();
        assert!(f.brands.get_by_id(brand.id).await.is_err());
    }

    #[tokio::test]
    async fn failed_brand_keeps_owner() {
        let mut f = setup().await;
        f.provisioner.create_brand(f.owner, "Acme").await.unwrap();

        f.cascade.fail_drop = true;
        assert!(f.cascade.delete_owner(f.owner).await.is_err());
        assert!(f.cascade.principals.get_by_id(f.owner).await.is_ok());

        f.cascade.fail_drop = false;
        assert_eq!(f.cascade.delete_owner(f.owner).await.unwrap(), 1);
        assert!(f.cascade.principals.get_by_id(f.owner).await.is_err());
    }
}
