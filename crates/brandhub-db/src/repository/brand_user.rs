//! [`BrandUserDirectory`] over the [`ConnectionRouter`].
//!
//! Lookups run inside the brand's own database; the catalog is consulted
//! only by the router to find that database.

use std::str::FromStr;
use std::sync::Arc;

use brandhub_core::error::BrandResult;
use brandhub_core::models::brand_user::{BrandRole, BrandUser, ScopedBrandUser};
use brandhub_core::repository::BrandUserDirectory;
use chrono::{DateTime, Utc};
use surrealdb::Connection;
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::connection::BrandConnector;
use crate::error::DbError;
use crate::router::ConnectionRouter;

#[derive(Debug, SurrealValue)]
struct BrandUserRowWithId {
    record_id: String,
    api_key: String,
    api_password_hash: String,
    name: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BrandUserRowWithId {
    fn try_into_user(self, roles: Vec<BrandRole>) -> Result<BrandUser, DbError> {
        let id = Uuid::parse_str(&self.record_id).map_err(|e| DbError::corrupt("UUID", e))?;
        Ok(BrandUser {
            id,
            api_key: self.api_key,
            api_password_hash: self.api_password_hash,
            name: self.name,
            active: self.active,
            roles,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub struct SurrealBrandUserDirectory<C: Connection, K: BrandConnector<C>> {
    router: Arc<ConnectionRouter<C, K>>,
}

impl<C: Connection, K: BrandConnector<C>> SurrealBrandUserDirectory<C, K> {
    pub fn new(router: Arc<ConnectionRouter<C, K>>) -> Self {
        Self { router }
    }
}

impl<C: Connection, K: BrandConnector<C>> BrandUserDirectory for SurrealBrandUserDirectory<C, K> {
    async fn find_by_api_key(&self, brand_id: Uuid, api_key: &str) -> BrandResult<ScopedBrandUser> {
        let handle = self.router.resolve(brand_id).await?;
        let index = handle.result_index();

        let query = handle.scoped(
            "SELECT meta::id(id) AS record_id, * FROM brand_user \
             WHERE api_key = $api_key;",
        )?;
        let mut result = handle
            .client()
            .query(&query)
            .bind(("api_key", api_key.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BrandUserRowWithId> = result.take(index).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "brand_user".into(),
            id: format!("api_key={api_key}"),
        })?;

        let query = handle.scoped(
            "SELECT VALUE role FROM brand_user_role \
             WHERE user_id = $user_id ORDER BY role;",
        )?;
        let mut result = handle
            .client()
            .query(&query)
            .bind(("user_id", row.record_id.clone()))
            .await
            .map_err(DbError::from)?;
        let role_names: Vec<String> = result.take(index).map_err(DbError::from)?;
        let roles = role_names
            .iter()
            .map(|r| BrandRole::from_str(r).map_err(DbError::Query))
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(ScopedBrandUser {
            brand_id,
            namespace: handle.namespace().to_string(),
            user: row.try_into_user(roles)?,
        })
    }
}
