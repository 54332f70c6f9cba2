//! Brand-scoped key/value stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BrandError, BrandResult};

pub const MAX_STORE_KEY_LEN: usize = 128;
pub const MAX_STORE_VALUE_LEN: usize = 4096;

/// Key under which the current display name of a brand is kept.
pub const BRAND_NAME_KEY: &str = "Brand Name";

/// The two stores every brand namespace carries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StoreKind {
    /// Free-form descriptive entries.
    Info,
    /// Structured settings.
    Config,
}

impl StoreKind {
    pub fn table(&self) -> &'static str {
        match self {
            StoreKind::Info => "brand_info",
            StoreKind::Config => "brand_config",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreEntry {
    pub key: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn validate_entry(key: &str, value: &str) -> BrandResult<()> {
    if key.trim().is_empty() {
        return Err(BrandError::validation("key must not be empty"));
    }
    if key.chars().count() > MAX_STORE_KEY_LEN {
        return Err(BrandError::validation(format!(
            "key must be at most {MAX_STORE_KEY_LEN} characters"
        )));
    }
    if value.chars().count() > MAX_STORE_VALUE_LEN {
        return Err(BrandError::validation(format!(
            "value must be at most {MAX_STORE_VALUE_LEN} characters"
        )));
    }
    Ok(())
}
