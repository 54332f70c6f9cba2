//! SurrealDB repository implementations.

mod brand;
mod brand_store;
mod brand_user;
mod principal;

pub use brand::SurrealBrandRepository;
pub use brand_store::SurrealBrandStore;
pub use brand_user::SurrealBrandUserDirectory;
pub use principal::SurrealPrincipalRepository;
