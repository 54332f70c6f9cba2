//! The identity attached to a request.
//!
//! Resolved once per request from the bearer token and passed down
//! explicitly. Principal and Brand identities never stand in for one
//! another: every operation asks for exactly the shape it needs.

use uuid::Uuid;

use crate::error::{BrandError, BrandResult};
use crate::models::brand_user::BrandRole;
use crate::models::principal::PrincipalRole;

/// A system-level account acting on its own behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalIdentity {
    pub principal_id: Uuid,
    pub email: String,
    pub roles: Vec<PrincipalRole>,
}

impl PrincipalIdentity {
    pub fn has_role(&self, role: PrincipalRole) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_system_admin(&self) -> bool {
        self.has_role(PrincipalRole::SystemAdmin)
    }
}

/// A brand user acting inside exactly one brand namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandIdentity {
    pub brand_id: Uuid,
    pub namespace: String,
    pub user_id: Uuid,
    pub roles: Vec<BrandRole>,
}

impl BrandIdentity {
    pub fn has_role(&self, role: BrandRole) -> bool {
        self.roles.contains(&role)
    }

    pub fn require_role(&self, role: BrandRole) -> BrandResult<()> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(BrandError::denied(format!("requires the {role} role")))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Principal(PrincipalIdentity),
    Brand(BrandIdentity),
    Anonymous,
}

impl Identity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    pub fn require_principal(&self) -> BrandResult<&PrincipalIdentity> {
        match self {
            Identity::Principal(p) => Ok(p),
            Identity::Brand(_) => Err(BrandError::denied(
                "a brand token cannot be used for account operations",
            )),
            Identity::Anonymous => Err(unauthenticated()),
        }
    }

    pub fn require_brand(&self) -> BrandResult<&BrandIdentity> {
        match self {
            Identity::Brand(b) => Ok(b),
            Identity::Principal(_) => Err(BrandError::denied(
                "a principal token cannot be used for brand operations",
            )),
            Identity::Anonymous => Err(unauthenticated()),
        }
    }

    /// Like [`Identity::require_brand`], additionally pinned to one brand.
    pub fn require_brand_for(&self, brand_id: Uuid) -> BrandResult<&BrandIdentity> {
        let brand = self.require_brand()?;
        if brand.brand_id != brand_id {
            return Err(BrandError::denied("token is scoped to a different brand"));
        }
        Ok(brand)
    }
}

fn unauthenticated() -> BrandError {
    BrandError::AuthenticationFailed {
        reason: "missing or invalid token".into(),
    }
}
