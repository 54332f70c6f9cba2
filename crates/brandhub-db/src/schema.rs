//! Schema definitions and migration runner for SurrealDB.
//!
//! The catalog schema is versioned and applied by [`run_migrations`].
//! The brand schema is not migrated: it is applied once per brand
//! database while the brand is provisioned.
//!
//! All table definitions use SCHEMAFULL mode. UUIDs are stored as
//! strings; enums are stored as strings with ASSERT constraints.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "catalog",
    sql: CATALOG_V1,
}];

// -----------------------------------------------------------------------
// Catalog v1
// -----------------------------------------------------------------------

const CATALOG_V1: &str = "\
-- =======================================================================
-- Principals (system scope)
-- =======================================================================
DEFINE TABLE principal SCHEMAFULL;
DEFINE FIELD email ON TABLE principal TYPE string;
DEFINE FIELD password_hash ON TABLE principal TYPE string;
DEFINE FIELD roles ON TABLE principal TYPE array DEFAULT [];
DEFINE FIELD roles.* ON TABLE principal TYPE string \
    ASSERT $value IN ['Member', 'SystemAdmin'];
DEFINE FIELD created_at ON TABLE principal TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE principal TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_principal_email ON TABLE principal \
    COLUMNS email UNIQUE;

-- =======================================================================
-- Brands (system scope)
-- =======================================================================
DEFINE TABLE brand SCHEMAFULL;
DEFINE FIELD name ON TABLE brand TYPE string;
DEFINE FIELD namespace ON TABLE brand TYPE string;
DEFINE FIELD owner_id ON TABLE brand TYPE string;
DEFINE FIELD db_principal ON TABLE brand TYPE string;
DEFINE FIELD db_principal_secret ON TABLE brand TYPE string;
DEFINE FIELD active ON TABLE brand TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE brand TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE brand TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_brand_namespace ON TABLE brand \
    COLUMNS namespace UNIQUE;
DEFINE INDEX idx_brand_owner ON TABLE brand COLUMNS owner_id;

-- =======================================================================
-- Namespace ledger (system scope, append-only)
-- =======================================================================
DEFINE TABLE namespace_ledger SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD namespace ON TABLE namespace_ledger TYPE string;
DEFINE FIELD brand_id ON TABLE namespace_ledger TYPE string;
DEFINE FIELD reserved_at ON TABLE namespace_ledger TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_ledger_namespace ON TABLE namespace_ledger \
    COLUMNS namespace UNIQUE;
";

// -----------------------------------------------------------------------
// Brand database
// -----------------------------------------------------------------------

/// Tables every brand database holds, in definition order.
pub const BRAND_TABLES: [&str; 4] = ["brand_user", "brand_user_role", "brand_info", "brand_config"];

const BRAND_SCHEMA: &str = "\
DEFINE TABLE brand_user SCHEMAFULL;
DEFINE FIELD api_key ON TABLE brand_user TYPE string;
DEFINE FIELD api_password_hash ON TABLE brand_user TYPE string;
DEFINE FIELD name ON TABLE brand_user TYPE string;
DEFINE FIELD active ON TABLE brand_user TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE brand_user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE brand_user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_brand_user_api_key ON TABLE brand_user \
    COLUMNS api_key UNIQUE;

DEFINE TABLE brand_user_role SCHEMAFULL;
DEFINE FIELD user_id ON TABLE brand_user_role TYPE string;
DEFINE FIELD role ON TABLE brand_user_role TYPE string \
    ASSERT $value IN ['Owner', 'Operator'];
DEFINE FIELD created_at ON TABLE brand_user_role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_brand_user_role ON TABLE brand_user_role \
    COLUMNS user_id, role UNIQUE;

DEFINE TABLE brand_info SCHEMAFULL;
DEFINE FIELD key ON TABLE brand_info TYPE string;
DEFINE FIELD value ON TABLE brand_info TYPE string;
DEFINE FIELD created_at ON TABLE brand_info TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE brand_info TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_brand_info_key ON TABLE brand_info COLUMNS key UNIQUE;

DEFINE TABLE brand_config SCHEMAFULL;
DEFINE FIELD key ON TABLE brand_config TYPE string;
DEFINE FIELD value ON TABLE brand_config TYPE string;
DEFINE FIELD created_at ON TABLE brand_config TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE brand_config TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_brand_config_key ON TABLE brand_config COLUMNS key UNIQUE;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending catalog migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// DDL for the tables of one brand database.
pub fn brand_schema() -> &'static str {
    BRAND_SCHEMA
}
