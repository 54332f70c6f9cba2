//! SurrealDB implementation of [`BrandRepository`], the brand catalog.
//!
//! Every reserved namespace is also written to `namespace_ledger`, which
//! is never deleted from. Its UNIQUE index is what keeps a namespace from
//! being handed out twice, including after the brand is gone.

use brandhub_core::error::BrandResult;
use brandhub_core::models::brand::{Brand, ReserveBrand};
use brandhub_core::repository::{BrandRepository, PaginatedResult, Pagination};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct BrandRow {
    name: String,
    namespace: String,
    owner_id: String,
    db_principal: String,
    db_principal_secret: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct BrandRowWithId {
    record_id: String,
    name: String,
    namespace: String,
    owner_id: String,
    db_principal: String,
    db_principal_secret: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BrandRow {
    fn into_brand(self, id: Uuid) -> Result<Brand, DbError> {
        let owner_id =
            Uuid::parse_str(&self.owner_id).map_err(|e| DbError::corrupt("owner UUID", e))?;
        Ok(Brand {
            id,
            name: self.name,
            namespace: self.namespace,
            owner_id,
            db_principal: self.db_principal,
            db_principal_secret: self.db_principal_secret,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl BrandRowWithId {
    fn try_into_brand(self) -> Result<Brand, DbError> {
        let id = Uuid::parse_str(&self.record_id).map_err(|e| DbError::corrupt("UUID", e))?;
        BrandRow {
            name: self.name,
            namespace: self.namespace,
            owner_id: self.owner_id,
            db_principal: self.db_principal,
            db_principal_secret: self.db_principal_secret,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_brand(id)
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Thrown by `reserve` when the owner has no `principal` row. Must match
/// the THROW text in the reserve statement.
const OWNER_MISSING: &str = "owner principal not found";

/// SurrealDB implementation of the brand catalog.
#[derive(Clone)]
pub struct SurrealBrandRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealBrandRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn set_active(&self, id: Uuid, active: bool) -> BrandResult<Brand> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('brand', $id) SET \
                 active = $active, updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("active", active))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from)?;

        let rows: Vec<BrandRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "brand".into(),
            id: id_str,
        })?;

        Ok(row.into_brand(id)?)
    }

    /// Whether `namespace` was ever handed out.
    pub async fn namespace_reserved(&self, namespace: &str) -> BrandResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM namespace_ledger \
                 WHERE namespace = $namespace GROUP ALL",
            )
            .bind(("namespace", namespace.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().is_some_and(|r| r.total > 0))
    }
}

impl<C: Connection> BrandRepository for SurrealBrandRepository<C> {
    async fn reserve(&self, input: ReserveBrand) -> BrandResult<Brand> {
        let id_str = input.id.to_string();

        // The ledger row goes first. If the brand row then fails, the
        // ledger entry stays behind and only burns an unused name.
        self.db
            .query(
                "CREATE namespace_ledger SET \
                 namespace = $namespace, brand_id = $brand_id",
            )
            .bind(("namespace", input.namespace.clone()))
            .bind(("brand_id", id_str.clone()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("namespace", e))?;

        // Owner check and insert form one statement, so a principal
        // deleted concurrently never ends up owning a fresh brand.
        let result = self
            .db
            .query(
                "IF record::exists(type::record('principal', $owner_id)) { \
                     CREATE type::record('brand', $id) SET \
                     name = $name, namespace = $namespace, \
                     owner_id = $owner_id, db_principal = $db_principal, \
                     db_principal_secret = $db_principal_secret, \
                     active = false \
                 } ELSE { \
                     THROW 'owner principal not found' \
                 }",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("namespace", input.namespace.clone()))
            .bind(("owner_id", input.owner_id.to_string()))
            .bind(("db_principal", input.db_principal))
            .bind(("db_principal_secret", input.db_principal_secret))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| {
            if e.to_string().contains(OWNER_MISSING) {
                DbError::NotFound {
                    entity: "principal".into(),
                    id: input.owner_id.to_string(),
                }
            } else {
                DbError::from_statement("brand", e)
            }
        })?;

        let rows: Vec<BrandRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "brand".into(),
            id: id_str,
        })?;

        debug!(brand_id = %input.id, namespace = %input.namespace, "catalog row reserved");
        Ok(row.into_brand(input.id)?)
    }

    async fn activate(&self, id: Uuid) -> BrandResult<Brand> {
        self.set_active(id, true).await
    }

    async fn deactivate(&self, id: Uuid) -> BrandResult<Brand> {
        self.set_active(id, false).await
    }

    async fn get_by_id(&self, id: Uuid) -> BrandResult<Brand> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('brand', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BrandRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "brand".into(),
            id: id_str,
        })?;

        Ok(row.into_brand(id)?)
    }

    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        pagination: Pagination,
    ) -> BrandResult<PaginatedResult<Brand>> {
        let owner_id_str = owner_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM brand \
                 WHERE owner_id = $owner_id GROUP ALL",
            )
            .bind(("owner_id", owner_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM brand \
                 WHERE owner_id = $owner_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("owner_id", owner_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BrandRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_brand())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn delete(&self, id: Uuid) -> BrandResult<()> {
        self.db
            .query("DELETE type::record('brand', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }
}
