//! Brand (tenant) domain model.
//!
//! A brand is an isolated customer namespace on the shared database
//! server. The catalog row records where that namespace lives and which
//! database principal may operate inside it; the brand's own data never
//! appears in the catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BrandError, BrandResult};

/// Maximum length of a brand display name, in characters.
pub const MAX_BRAND_NAME_LEN: usize = 64;

/// Catalog record of a brand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brand {
    pub id: Uuid,
    /// Display name given at creation. Not unique.
    pub name: String,
    /// Name of the isolated namespace, derived from `id`. Unique and
    /// never reused.
    pub namespace: String,
    /// Principal that owns this brand.
    pub owner_id: Uuid,
    /// Database principal scoped to `namespace`.
    pub db_principal: String,
    /// Sealed (AES-256-GCM, base64) password of `db_principal`.
    #[serde(skip_serializing)]
    pub db_principal_secret: String,
    /// `false` while provisioning or deleting.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields written when a catalog row is reserved, before the namespace
/// exists.
#[derive(Debug, Clone)]
pub struct ReserveBrand {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub namespace: String,
    pub db_principal: String,
    pub db_principal_secret: String,
}

impl ReserveBrand {
    /// Derive namespace and principal names from a fresh identifier.
    pub fn new(owner_id: Uuid, name: String, db_principal_secret: String) -> Self {
        let id = Uuid::new_v4();
        let namespace = namespace_for(id);
        let db_principal = db_principal_for(&namespace);
        Self {
            id,
            owner_id,
            name,
            namespace,
            db_principal,
            db_principal_secret,
        }
    }
}

/// Namespace name for a brand id: `brand_<32 hex digits>`.
pub fn namespace_for(id: Uuid) -> String {
    format!("brand_{}", id.simple())
}

/// Database principal name for a namespace.
pub fn db_principal_for(namespace: &str) -> String {
    format!("{namespace}_svc")
}

/// The phrase a caller must echo to delete a brand.
pub fn deletion_phrase(id: Uuid) -> String {
    format!("DELETE {id}")
}

/// Validate and normalize a requested display name.
///
/// Names are trimmed, must be 1..=64 characters, and may contain
/// letters, digits, spaces and `- _ . & '`.
pub fn validate_brand_name(requested: &str) -> BrandResult<String> {
    let name = requested.trim();
    if name.is_empty() {
        return Err(BrandError::validation("brand name must not be empty"));
    }
    if name.chars().count() > MAX_BRAND_NAME_LEN {
        return Err(BrandError::validation(format!(
            "brand name must be at most {MAX_BRAND_NAME_LEN} characters"
        )));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | '&' | '\'')))
    {
        return Err(BrandError::validation(format!(
            "brand name contains unsupported character '{bad}'"
        )));
    }
    Ok(name.to_string())
}
