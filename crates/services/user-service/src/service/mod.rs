//! Application services: one method per use case.

mod user_service;

pub use user_service::{UserManager, UserService};
