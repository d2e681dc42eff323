//! Common utilities shared across services.
//!
//! This crate provides:
//! - Unified error handling with storage error classification
//! - Database and pool configuration structures
//! - Offset/limit pagination types

pub mod config;
pub mod error;
pub mod pagination;

pub use config::*;
pub use error::{AppError, AppResult, OptionExt, StorageError};
pub use pagination::{Page, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
