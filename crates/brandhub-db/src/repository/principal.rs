//! SurrealDB implementation of [`PrincipalRepository`].
//!
//! Passwords are hashed with Argon2id before they reach the database; an
//! optional pepper can be provided at construction time.

use std::str::FromStr;

use brandhub_auth::password::hash_password;
use brandhub_core::error::BrandResult;
use brandhub_core::models::principal::{
    CreatePrincipal, Principal, PrincipalRole, normalize_email,
};
use brandhub_core::repository::PrincipalRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct PrincipalRow {
    email: String,
    password_hash: String,
    roles: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct PrincipalRowWithId {
    record_id: String,
    email: String,
    password_hash: String,
    roles: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_roles(roles: &[String]) -> Result<Vec<PrincipalRole>, DbError> {
    roles
        .iter()
        .map(|r| PrincipalRole::from_str(r).map_err(DbError::Query))
        .collect()
}

impl PrincipalRow {
    fn into_principal(self, id: Uuid) -> Result<Principal, DbError> {
        Ok(Principal {
            id,
            email: self.email,
            password_hash: self.password_hash,
            roles: parse_roles(&self.roles)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PrincipalRowWithId {
    fn try_into_principal(self) -> Result<Principal, DbError> {
        let id = Uuid::parse_str(&self.record_id).map_err(|e| DbError::corrupt("UUID", e))?;
        Ok(Principal {
            id,
            email: self.email,
            password_hash: self.password_hash,
            roles: parse_roles(&self.roles)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Principal repository.
#[derive(Clone)]
pub struct SurrealPrincipalRepository<C: Connection> {
    db: Surreal<C>,
    pepper: Option<String>,
}

impl<C: Connection> SurrealPrincipalRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db, pepper: None }
    }

    pub fn with_pepper(db: Surreal<C>, pepper: Option<String>) -> Self {
        Self { db, pepper }
    }
}

impl<C: Connection> PrincipalRepository for SurrealPrincipalRepository<C> {
    async fn create(&self, input: CreatePrincipal) -> BrandResult<Principal> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let password_hash = hash_password(&input.password, self.pepper.as_deref())?;
        let roles: Vec<String> = input.roles.iter().map(|r| r.as_str().to_string()).collect();

        let result = self
            .db
            .query(
                "CREATE type::record('principal', $id) SET \
                 email = $email, password_hash = $password_hash, \
                 roles = $roles",
            )
            .bind(("id", id_str.clone()))
            .bind(("email", normalize_email(&input.email)))
            .bind(("password_hash", password_hash))
            .bind(("roles", roles))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("principal", e))?;

        let rows: Vec<PrincipalRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "principal".into(),
            id: id_str,
        })?;

        Ok(row.into_principal(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> BrandResult<Principal> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('principal', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PrincipalRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "principal".into(),
            id: id_str,
        })?;

        Ok(row.into_principal(id)?)
    }

    async fn get_by_email(&self, email: &str) -> BrandResult<Principal> {
        let email = normalize_email(email);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM principal \
                 WHERE email = $email",
            )
            .bind(("email", email.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PrincipalRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "principal".into(),
            id: format!("email={email}"),
        })?;

        Ok(row.try_into_principal()?)
    }

    async fn delete(&self, id: Uuid) -> BrandResult<()> {
        self.db
            .query("DELETE type::record('principal', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }
}
