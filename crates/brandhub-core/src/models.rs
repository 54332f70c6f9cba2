//! Domain models for BrandHub.

pub mod brand;
pub mod brand_user;
pub mod principal;
pub mod store;
