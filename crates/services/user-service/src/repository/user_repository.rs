//! User repository contract.
//!
//! One implementation per storage driver; both must be observably identical
//! (same results, same error conditions).

use async_trait::async_trait;

use common::{AppResult, PageRequest};
use domain::{NewUser, User};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user; storage assigns `id` and `created_at`.
    ///
    /// Fails with `ConstraintViolation` when the username or email is taken.
    async fn add(&self, user: NewUser) -> AppResult<User>;

    /// Find user by ID
    async fn get_by_id(&self, id: i32) -> AppResult<Option<User>>;

    /// Find user by exact username
    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn exists_by_username(&self, username: &str) -> AppResult<bool>;

    async fn exists_by_email(&self, email: &str) -> AppResult<bool>;

    /// Users ordered by `id` ascending, plus the total row count
    async fn list_paginated(&self, page: PageRequest) -> AppResult<(Vec<User>, u64)>;

    /// Persist the mutable columns of an existing user.
    ///
    /// Fails with `NotFound` if the row no longer exists.
    async fn update(&self, user: &User) -> AppResult<User>;

    /// Hard delete; returns whether a row was removed
    async fn delete(&self, id: i32) -> AppResult<bool>;
}
