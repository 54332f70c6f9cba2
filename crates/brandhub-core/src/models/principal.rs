//! Principal (system-level account) domain model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PrincipalRole {
    Member,
    /// May delete brands it does not own.
    SystemAdmin,
}

impl PrincipalRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalRole::Member => "Member",
            PrincipalRole::SystemAdmin => "SystemAdmin",
        }
    }
}

impl fmt::Display for PrincipalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrincipalRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Member" => Ok(PrincipalRole::Member),
            "SystemAdmin" => Ok(PrincipalRole::SystemAdmin),
            other => Err(format!("unknown principal role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub roles: Vec<PrincipalRole>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreatePrincipal {
    pub email: String,
    /// Raw password (hashed with Argon2id before storage).
    pub password: String,
    pub roles: Vec<PrincipalRole>,
}

/// Canonical form of an email address used for lookups and the unique
/// index.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
