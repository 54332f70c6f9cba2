//! BrandHub Database: SurrealDB connection management, the brand
//! catalog, and per-brand database lifecycle.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`], brand connectors)
//! - Catalog migrations ([`run_migrations`]) and the brand table schema
//! - Repository implementations of the `brandhub-core` traits
//! - Brand routing ([`ConnectionRouter`]), provisioning
//!   ([`BrandProvisioner`]) and deletion ([`CascadeDeletionOrchestrator`])

pub mod cascade;
mod connection;
pub mod ddl;
mod error;
pub mod provisioner;
pub mod repository;
pub mod router;
mod schema;

pub use cascade::CascadeDeletionOrchestrator;
pub use connection::{
    BrandConnector, BrandSession, BrandTarget, CatalogScope, DbConfig, DbManager,
    SharedBrandConnector, WsBrandConnector,
};
pub use error::DbError;
pub use provisioner::{BrandProvisioner, ProvisionedBrand, Step, StepError};
pub use router::{BrandHandle, ConnectionRouter};
pub use schema::{BRAND_TABLES, brand_schema, run_migrations};
