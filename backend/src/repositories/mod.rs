pub mod common;
pub mod directory_repository;
pub mod memory;
pub mod request_repository;

pub use directory_repository::{PgRecipientDirectory, RecipientDirectory};
pub use memory::{InMemoryDirectory, InMemoryRequestStore};
pub use request_repository::{PgRequestRepository, RequestFilter, RequestStore};
