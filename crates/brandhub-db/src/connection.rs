//! SurrealDB connection management.
//!
//! The catalog lives in one database of the system namespace. Every brand
//! gets a sibling database in the same namespace, reached either through
//! a dedicated session signed in as the brand's database user
//! ([`WsBrandConnector`]) or through a shared client that switches
//! database per query ([`SharedBrandConnector`]).

use std::fmt;

use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::{Database, Root};
use surrealdb::{Connection, Surreal};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbError;

/// Configuration for connecting to SurrealDB.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket URL (e.g., `127.0.0.1:8000`).
    pub url: String,
    /// SurrealDB namespace holding the catalog and all brand databases.
    pub namespace: String,
    /// Catalog database name.
    pub database: String,
    /// Root username for authentication.
    pub username: String,
    /// Root password for authentication.
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "brandhub".into(),
            database: "catalog".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    pub fn catalog_scope(&self) -> CatalogScope {
        CatalogScope::new(&self.namespace, &self.database)
    }
}

/// The namespace/database pair an administrative session normally sits in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogScope {
    pub namespace: String,
    pub database: String,
}

impl CatalogScope {
    pub fn new(namespace: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            database: database.into(),
        }
    }

    /// `USE` statement selecting `database` inside this scope's namespace.
    pub(crate) fn use_database(&self, database: &str) -> Result<String, DbError> {
        Ok(format!(
            "USE NS {} DB {};",
            quote_ident(&self.namespace)?,
            quote_ident(database)?
        ))
    }

    /// `USE` statement returning to the catalog database.
    pub(crate) fn use_home(&self) -> Result<String, DbError> {
        self.use_database(&self.database)
    }

    /// Wrap `statement` so it runs inside `database` and the session is
    /// back on the catalog afterwards.
    pub(crate) fn wrap(&self, database: &str, statement: &str) -> Result<String, DbError> {
        Ok(format!(
            "{}\n{}\n{}",
            self.use_database(database)?,
            statement,
            self.use_home()?
        ))
    }
}

/// Quote a namespace, database or user name for interpolation into DDL.
///
/// Only ASCII letters, digits, `_` and `-` are accepted; anything else is
/// rejected rather than escaped.
pub(crate) fn quote_ident(name: &str) -> Result<String, DbError> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(DbError::Query(format!("illegal identifier: {name:?}")));
    }
    Ok(format!("`{name}`"))
}

/// Manages the administrative connection to SurrealDB.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
    config: DbConfig,
}

impl DbManager {
    /// Connect to SurrealDB using the provided configuration.
    ///
    /// Authenticates as root, defines and selects the configured
    /// namespace and catalog database, and returns a ready-to-use manager.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;

        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;

        db.query(format!(
            "DEFINE NAMESPACE IF NOT EXISTS {ns};\n\
             USE NS {ns};\n\
             DEFINE DATABASE IF NOT EXISTS {db};",
            ns = quote_ident(&config.namespace)?,
            db = quote_ident(&config.database)?,
        ))
        .await?
        .check()?;

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!("Successfully connected to SurrealDB");

        Ok(Self {
            db,
            config: config.clone(),
        })
    }

    /// Returns a reference to the underlying SurrealDB client.
    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }
}

/// Where, and as whom, a brand session connects.
#[derive(Clone)]
pub struct BrandTarget {
    pub brand_id: Uuid,
    /// System namespace the brand database lives in.
    pub namespace: String,
    /// The brand database.
    pub database: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BrandTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrandTarget")
            .field("brand_id", &self.brand_id)
            .field("namespace", &self.namespace)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An open session able to query one brand database.
pub struct BrandSession<C: Connection> {
    pub client: Surreal<C>,
    /// `Some` when the client is shared and must be pointed at the brand
    /// database per query, then returned to this scope.
    pub home: Option<CatalogScope>,
}

/// Opens sessions for brand databases.
pub trait BrandConnector<C: Connection>: Send + Sync {
    fn connect(
        &self,
        target: &BrandTarget,
    ) -> impl Future<Output = Result<BrandSession<C>, DbError>> + Send;
}

/// Opens a dedicated WebSocket session per brand, signed in as the
/// brand's own database user. The engine confines that user to its
/// database.
#[derive(Debug, Clone)]
pub struct WsBrandConnector {
    url: String,
}

impl WsBrandConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl BrandConnector<Client> for WsBrandConnector {
    async fn connect(&self, target: &BrandTarget) -> Result<BrandSession<Client>, DbError> {
        debug!(brand_id = %target.brand_id, database = %target.database, "opening brand session");

        let db = Surreal::new::<Ws>(&self.url).await?;
        db.signin(Database {
            namespace: target.namespace.clone(),
            database: target.database.clone(),
            username: target.username.clone(),
            password: target.password.clone(),
        })
        .await?;
        db.use_ns(&target.namespace)
            .use_db(&target.database)
            .await?;

        Ok(BrandSession {
            client: db,
            home: None,
        })
    }
}

/// Reuses one administrative client for every brand.
///
/// Meant for embedded engines and tests. Queries are wrapped in `USE`
/// statements, so the client must not be shared with code that relies on
/// the session's current database between queries.
#[derive(Clone)]
pub struct SharedBrandConnector<C: Connection> {
    client: Surreal<C>,
    home: CatalogScope,
}

impl<C: Connection> SharedBrandConnector<C> {
    pub fn new(client: Surreal<C>, home: CatalogScope) -> Self {
        Self { client, home }
    }
}

impl<C: Connection> BrandConnector<C> for SharedBrandConnector<C> {
    async fn connect(&self, target: &BrandTarget) -> Result<BrandSession<C>, DbError> {
        debug!(brand_id = %target.brand_id, database = %target.database, "sharing admin session");
        Ok(BrandSession {
            client: self.client.clone(),
            home: Some(self.home.clone()),
        })
    }
}
