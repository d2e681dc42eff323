//! Repository layer for data access.
//!
//! Repositories are generic over the handle they run on, so the same type
//! serves pool-backed reads and transaction-bound units of work.

pub mod entities;
mod orm_user_repository;
mod raw_user_repository;
mod user_repository;

pub use orm_user_repository::OrmUserRepository;
pub use raw_user_repository::RawUserRepository;
pub use user_repository::UserRepository;

// Export mock for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
