//! Brand id to database session resolution, with caching.

use std::sync::Arc;

use brandhub_auth::vault::SecretVault;
use brandhub_core::error::{BrandError, BrandResult};
use brandhub_core::repository::BrandRepository;
use dashmap::{DashMap, DashSet};
use surrealdb::{Connection, Surreal};
use tracing::{debug, info};
use uuid::Uuid;

use crate::connection::{BrandConnector, BrandTarget, CatalogScope};
use crate::error::DbError;
use crate::repository::SurrealBrandRepository;

/// A resolved session scoped to one brand database.
pub struct BrandHandle<C: Connection> {
    brand_id: Uuid,
    namespace: String,
    client: Surreal<C>,
    home: Option<CatalogScope>,
}

impl<C: Connection> BrandHandle<C> {
    pub fn brand_id(&self) -> Uuid {
        self.brand_id
    }

    /// The brand database this handle addresses.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn client(&self) -> &Surreal<C> {
        &self.client
    }

    /// Prepare `statement` for this handle's session.
    ///
    /// On a shared session the statement is wrapped in `USE` statements;
    /// read its result at [`BrandHandle::result_index`].
    pub fn scoped(&self, statement: &str) -> Result<String, DbError> {
        match &self.home {
            Some(home) => home.wrap(&self.namespace, statement),
            None => Ok(statement.to_string()),
        }
    }

    /// Index of the first statement passed to [`BrandHandle::scoped`] in
    /// the query response.
    pub fn result_index(&self) -> usize {
        if self.home.is_some() { 1 } else { 0 }
    }
}

/// Resolves brand ids to [`BrandHandle`]s.
///
/// Handles are cached per brand. [`ConnectionRouter::invalidate`] evicts
/// the entry and revokes the id, after which no resolution succeeds;
/// callers already holding an `Arc<BrandHandle>` may finish their work.
pub struct ConnectionRouter<C: Connection, K: BrandConnector<C>> {
    brands: SurrealBrandRepository<C>,
    vault: SecretVault,
    connector: K,
    system_namespace: String,
    cache: DashMap<Uuid, Arc<BrandHandle<C>>>,
    revoked: DashSet<Uuid>,
}

impl<C: Connection, K: BrandConnector<C>> ConnectionRouter<C, K> {
    pub fn new(
        brands: SurrealBrandRepository<C>,
        vault: SecretVault,
        connector: K,
        system_namespace: impl Into<String>,
    ) -> Self {
        Self {
            brands,
            vault,
            connector,
            system_namespace: system_namespace.into(),
            cache: DashMap::new(),
            revoked: DashSet::new(),
        }
    }

    pub async fn resolve(&self, brand_id: Uuid) -> BrandResult<Arc<BrandHandle<C>>> {
        if let Some(handle) = self.cache.get(&brand_id) {
            return Ok(Arc::clone(handle.value()));
        }
        if self.revoked.contains(&brand_id) {
            return Err(unavailable(brand_id));
        }

        let brand = self.brands.get_by_id(brand_id).await?;
        if !brand.active {
            debug!(%brand_id, "refusing to route to inactive brand");
            return Err(unavailable(brand_id));
        }

        let password = self.vault.open_string(&brand.db_principal_secret)?;
        let session = self
            .connector
            .connect(&BrandTarget {
                brand_id,
                namespace: self.system_namespace.clone(),
                database: brand.namespace.clone(),
                username: brand.db_principal.clone(),
                password,
            })
            .await?;

        let handle = Arc::new(BrandHandle {
            brand_id,
            namespace: brand.namespace,
            client: session.client,
            home: session.home,
        });
        let handle = Arc::clone(self.cache.entry(brand_id).or_insert(handle).value());

        // An invalidation may have run while we were connecting.
        if self.revoked.contains(&brand_id) {
            self.cache.remove(&brand_id);
            return Err(unavailable(brand_id));
        }

        debug!(%brand_id, namespace = %handle.namespace, "brand handle cached");
        Ok(handle)
    }

    /// Evict `brand_id` and refuse every later resolution.
    pub fn invalidate(&self, brand_id: Uuid) {
        self.revoked.insert(brand_id);
        if self.cache.remove(&brand_id).is_some() {
            info!(%brand_id, "brand handle evicted");
        }
    }

    /// Drop the revocation mark once the catalog row is gone; the missing
    /// row keeps resolution failing from then on.
    pub fn forget(&self, brand_id: Uuid) {
        self.revoked.remove(&brand_id);
    }

    pub fn is_cached(&self, brand_id: Uuid) -> bool {
        self.cache.contains_key(&brand_id)
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    pub fn revoked_count(&self) -> usize {
        self.revoked.len()
    }
}

fn unavailable(brand_id: Uuid) -> BrandError {
    BrandError::NotFound {
        entity: "brand".into(),
        id: brand_id.to_string(),
    }
}
