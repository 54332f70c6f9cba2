//! Administrative DDL against brand databases.
//!
//! Every function runs on the root-level administrative client, which
//! sits in the catalog database. Statements that must execute inside a
//! brand database are wrapped so the session is returned to the catalog
//! in the same query.

use surrealdb::{Connection, Surreal};

use crate::connection::{CatalogScope, quote_ident};
use crate::error::DbError;
use crate::schema::{BRAND_TABLES, brand_schema};

/// Create the brand database. An existing database is a conflict.
pub async fn define_database<C: Connection>(
    db: &Surreal<C>,
    database: &str,
) -> Result<(), DbError> {
    db.query(format!("DEFINE DATABASE {};", quote_ident(database)?))
        .await?
        .check()
        .map_err(|e| DbError::from_statement("brand database", e))?;
    Ok(())
}

pub async fn remove_database<C: Connection>(
    db: &Surreal<C>,
    database: &str,
) -> Result<(), DbError> {
    db.query(format!("REMOVE DATABASE IF EXISTS {};", quote_ident(database)?))
        .await?
        .check()?;
    Ok(())
}

/// Define the brand's database-level user.
///
/// The password is interpolated as a literal, so only alphanumeric
/// secrets are accepted.
pub async fn define_principal<C: Connection>(
    db: &Surreal<C>,
    scope: &CatalogScope,
    database: &str,
    principal: &str,
    secret: &str,
) -> Result<(), DbError> {
    if secret.is_empty() || !secret.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(DbError::Query(
            "database principal secret must be alphanumeric".into(),
        ));
    }
    let statement = format!(
        "DEFINE USER {} ON DATABASE PASSWORD '{secret}' ROLES EDITOR;",
        quote_ident(principal)?
    );
    db.query(scope.wrap(database, &statement)?)
        .await?
        .check()
        .map_err(|e| DbError::from_statement("database principal", e))?;
    Ok(())
}

pub async fn remove_principal<C: Connection>(
    db: &Surreal<C>,
    scope: &CatalogScope,
    database: &str,
    principal: &str,
) -> Result<(), DbError> {
    let statement = format!(
        "REMOVE USER IF EXISTS {} ON DATABASE;",
        quote_ident(principal)?
    );
    db.query(scope.wrap(database, &statement)?)
        .await?
        .check()?;
    Ok(())
}

pub async fn define_tables<C: Connection>(
    db: &Surreal<C>,
    scope: &CatalogScope,
    database: &str,
) -> Result<(), DbError> {
    db.query(scope.wrap(database, brand_schema())?)
        .await?
        .check()
        .map_err(|e| DbError::from_statement("brand table", e))?;
    Ok(())
}

pub async fn remove_tables<C: Connection>(
    db: &Surreal<C>,
    scope: &CatalogScope,
    database: &str,
) -> Result<(), DbError> {
    let statement = BRAND_TABLES
        .iter()
        .map(|t| format!("REMOVE TABLE IF EXISTS {t};"))
        .collect::<Vec<_>>()
        .join("\n");
    db.query(scope.wrap(database, &statement)?)
        .await?
        .check()?;
    Ok(())
}

/// Names of the tables defined in a brand database.
pub async fn list_tables<C: Connection>(
    db: &Surreal<C>,
    scope: &CatalogScope,
    database: &str,
) -> Result<Vec<String>, DbError> {
    let mut result = db
        .query(scope.wrap(database, "INFO FOR DB;")?)
        .await?
        .check()?;
    // 0 is the leading USE.
    let info: Option<serde_json::Value> = result.take(1)?;
    Ok(object_keys(info, "tables"))
}

/// Names of all databases in the system namespace, catalog included.
pub async fn list_databases<C: Connection>(db: &Surreal<C>) -> Result<Vec<String>, DbError> {
    let mut result = db.query("INFO FOR NS;").await?.check()?;
    let info: Option<serde_json::Value> = result.take(0)?;
    Ok(object_keys(info, "databases"))
}

fn object_keys(info: Option<serde_json::Value>, field: &str) -> Vec<String> {
    let mut keys: Vec<String> = info
        .as_ref()
        .and_then(|v| v.get(field))
        .and_then(|v| v.as_object())
        .map(|o| o.keys().cloned().collect())
        .unwrap_or_default();
    keys.sort();
    keys
}
