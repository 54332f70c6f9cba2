//! BrandHub Core: domain models, request identity, error taxonomy and
//! repository traits shared by every other crate.

pub mod error;
pub mod identity;
pub mod models;
pub mod repository;

pub use error::{BrandError, BrandResult, ErrorKind};
pub use identity::{BrandIdentity, Identity, PrincipalIdentity};
