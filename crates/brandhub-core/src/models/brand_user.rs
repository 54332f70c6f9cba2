//! Brand-scoped user model. These rows live only inside a brand's own
//! namespace.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BrandRole {
    Owner,
    Operator,
}

impl BrandRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrandRole::Owner => "Owner",
            BrandRole::Operator => "Operator",
        }
    }
}

impl fmt::Display for BrandRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrandRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Owner" => Ok(BrandRole::Owner),
            "Operator" => Ok(BrandRole::Operator),
            other => Err(format!("unknown brand role: {other}")),
        }
    }
}

/// A user inside a brand's namespace.
///
/// `api_key` acts as the login name and is stored in plaintext; only
/// the password is hashed. Neither can be regenerated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandUser {
    pub id: Uuid,
    pub api_key: String,
    #[serde(skip_serializing)]
    pub api_password_hash: String,
    pub name: String,
    pub active: bool,
    pub roles: Vec<BrandRole>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A brand user together with the namespace it was found in.
#[derive(Debug, Clone)]
pub struct ScopedBrandUser {
    pub brand_id: Uuid,
    pub namespace: String,
    pub user: BrandUser,
}
