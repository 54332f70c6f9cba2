//! BrandHub Server: configuration and the operation facade the
//! transport layer calls into.

pub mod config;
pub mod operations;

pub use config::ServerConfig;
pub use operations::{ApiError, BrandOperations, CreatedBrand, MutationResponse};
