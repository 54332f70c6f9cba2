//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Catalog repositories operate on
//! the shared administrative store; brand-scoped traits take the brand
//! they operate on and must never reach into another brand's namespace.

use uuid::Uuid;

use crate::error::BrandResult;
use crate::identity::BrandIdentity;
use crate::models::{
    brand::{Brand, ReserveBrand},
    brand_user::ScopedBrandUser,
    principal::{CreatePrincipal, Principal},
    store::{StoreEntry, StoreKind},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Catalog (global scope)
// ---------------------------------------------------------------------------

pub trait PrincipalRepository: Send + Sync {
    fn create(&self, input: CreatePrincipal)
    -> impl Future<Output = BrandResult<Principal>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = BrandResult<Principal>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = BrandResult<Principal>> + Send;
    /// Hard delete. Callers must remove owned brands first.
    fn delete(&self, id: Uuid) -> impl Future<Output = BrandResult<()>> + Send;
}

/// The system-wide brand catalog.
pub trait BrandRepository: Send + Sync {
    /// Insert an inactive catalog row and record its namespace in the
    /// append-only ledger. A namespace collision is a `Conflict`.
    fn reserve(&self, input: ReserveBrand) -> impl Future<Output = BrandResult<Brand>> + Send;
    fn activate(&self, id: Uuid) -> impl Future<Output = BrandResult<Brand>> + Send;
    fn deactivate(&self, id: Uuid) -> impl Future<Output = BrandResult<Brand>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = BrandResult<Brand>> + Send;
    fn list_by_owner(
        &self,
        owner_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = BrandResult<PaginatedResult<Brand>>> + Send;
    /// Remove the catalog row. The ledger entry stays.
    fn delete(&self, id: Uuid) -> impl Future<Output = BrandResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Brand-scoped
// ---------------------------------------------------------------------------

/// Looks up brand users through the brand's own namespace.
pub trait BrandUserDirectory: Send + Sync {
    /// Resolve `brand_id` and find the user holding `api_key`.
    ///
    /// Unknown or inactive brands are `NotFound`, as are unknown keys.
    fn find_by_api_key(
        &self,
        brand_id: Uuid,
        api_key: &str,
    ) -> impl Future<Output = BrandResult<ScopedBrandUser>> + Send;
}

/// The `Info` and `Config` stores of a brand.
pub trait BrandStoreRepository: Send + Sync {
    fn entries(
        &self,
        scope: &BrandIdentity,
        kind: StoreKind,
    ) -> impl Future<Output = BrandResult<Vec<StoreEntry>>> + Send;
    fn get(
        &self,
        scope: &BrandIdentity,
        kind: StoreKind,
        key: &str,
    ) -> impl Future<Output = BrandResult<StoreEntry>> + Send;
    fn put(
        &self,
        scope: &BrandIdentity,
        kind: StoreKind,
        key: &str,
        value: &str,
    ) -> impl Future<Output = BrandResult<StoreEntry>> + Send;
    fn remove(
        &self,
        scope: &BrandIdentity,
        kind: StoreKind,
        key: &str,
    ) -> impl Future<Output = BrandResult<()>> + Send;
}
