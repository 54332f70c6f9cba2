//! [`BrandStoreRepository`] for the `Info` and `Config` stores.
//!
//! Entries are keyed by record id (`brand_info:⟨key⟩`), so a key is
//! unique within its store. Every call is routed through the identity's
//! own brand; the resolved database must match the namespace the token
//! was issued for.

use std::sync::Arc;

use brandhub_core::error::{BrandError, BrandResult};
use brandhub_core::identity::BrandIdentity;
use brandhub_core::models::store::{StoreEntry, StoreKind, validate_entry};
use brandhub_core::repository::BrandStoreRepository;
use chrono::{DateTime, Utc};
use surrealdb::Connection;
use surrealdb_types::SurrealValue;
use tracing::{debug, warn};

use crate::connection::BrandConnector;
use crate::error::DbError;
use crate::router::{BrandHandle, ConnectionRouter};

#[derive(Debug, SurrealValue)]
struct StoreRow {
    key: String,
    value: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StoreRow> for StoreEntry {
    fn from(row: StoreRow) -> Self {
        StoreEntry {
            key: row.key,
            value: row.value,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct SurrealBrandStore<C: Connection, K: BrandConnector<C>> {
    router: Arc<ConnectionRouter<C, K>>,
}

impl<C: Connection, K: BrandConnector<C>> SurrealBrandStore<C, K> {
    pub fn new(router: Arc<ConnectionRouter<C, K>>) -> Self {
        Self { router }
    }

    async fn handle_for(&self, scope: &BrandIdentity) -> BrandResult<Arc<BrandHandle<C>>> {
        let handle = match self.router.resolve(scope.brand_id).await {
            Ok(handle) => handle,
            Err(BrandError::NotFound { .. }) => {
                debug!(brand_id = %scope.brand_id, "brand token for unavailable brand");
                return Err(BrandError::denied("brand is not available"));
            }
            Err(e) => return Err(e),
        };
        if handle.namespace() != scope.namespace {
            warn!(
                brand_id = %scope.brand_id,
                claimed = %scope.namespace,
                "brand token namespace does not match catalog"
            );
            return Err(BrandError::denied("token is not scoped to this brand"));
        }
        Ok(handle)
    }
}

impl<C: Connection, K: BrandConnector<C>> BrandStoreRepository for SurrealBrandStore<C, K> {
    async fn entries(&self, scope: &BrandIdentity, kind: StoreKind) -> BrandResult<Vec<StoreEntry>> {
        let handle = self.handle_for(scope).await?;
        let query = handle.scoped(&format!(
            "SELECT key, value, created_at, updated_at FROM {} ORDER BY key ASC;",
            kind.table()
        ))?;

        let mut result = handle
            .client()
            .query(&query)
            .await
            .map_err(DbError::from)?;
        let rows: Vec<StoreRow> = result.take(handle.result_index()).map_err(DbError::from)?;

        Ok(rows.into_iter().map(StoreEntry::from).collect())
    }

    async fn get(&self, scope: &BrandIdentity, kind: StoreKind, key: &str) -> BrandResult<StoreEntry> {
        let handle = self.handle_for(scope).await?;
        let query = handle.scoped(&format!(
            "SELECT key, value, created_at, updated_at \
             FROM type::record('{}', $key);",
            kind.table()
        ))?;

        let mut result = handle
            .client()
            .query(&query)
            .bind(("key", key.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<StoreRow> = result.take(handle.result_index()).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: kind.table().into(),
            id: key.to_string(),
        })?;

        Ok(row.into())
    }

    async fn put(
        &self,
        scope: &BrandIdentity,
        kind: StoreKind,
        key: &str,
        value: &str,
    ) -> BrandResult<StoreEntry> {
        validate_entry(key, value)?;
        let handle = self.handle_for(scope).await?;
        let query = handle.scoped(&format!(
            "UPSERT type::record('{}', $key) SET \
             key = $key, value = $value, updated_at = time::now();",
            kind.table()
        ))?;

        let result = handle
            .client()
            .query(&query)
            .bind(("key", key.to_string()))
            .bind(("value", value.to_string()))
            .await
            .map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement(kind.table(), e))?;

        let rows: Vec<StoreRow> = result.take(handle.result_index()).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: kind.table().into(),
            id: key.to_string(),
        })?;

        debug!(brand_id = %scope.brand_id, store = kind.table(), key, "store entry written");
        Ok(row.into())
    }

    async fn remove(&self, scope: &BrandIdentity, kind: StoreKind, key: &str) -> BrandResult<()> {
        let handle = self.handle_for(scope).await?;
        let query = handle.scoped(&format!(
            "DELETE type::record('{}', $key) RETURN BEFORE;",
            kind.table()
        ))?;

        let result = handle
            .client()
            .query(&query)
            .bind(("key", key.to_string()))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(DbError::from)?;

        let rows: Vec<StoreRow> = result.take(handle.result_index()).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::NotFound {
                entity: kind.table().into(),
                id: key.to_string(),
            }
            .into());
        }
        Ok(())
    }
}
