//! User service - Handles user-related use cases.
//!
//! Every mutating method is its own transaction boundary and runs inside a
//! unit of work. Read-only methods go straight to a pool-backed repository.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use common::{AppError, AppResult, OptionExt, Page, PageRequest, MAX_PAGE_SIZE};
use domain::{CreateUser, NewUser, UpdateUser, User};

use crate::infra::{TransactionMode, UnitOfWorkFactory};
use crate::with_unit_of_work;

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Validate, check for duplicates and store a new user
    async fn create_user(&self, cmd: CreateUser) -> AppResult<User>;

    async fn get_user(&self, id: i32) -> AppResult<User>;

    async fn get_user_by_username(&self, username: &str) -> AppResult<User>;

    /// Users ordered by id, with the limit capped at the configured maximum
    async fn list_users(&self, page: PageRequest) -> AppResult<Page<User>>;

    /// Apply the requested changes; `None` fields are left as they are
    async fn update_user(&self, id: i32, cmd: UpdateUser) -> AppResult<User>;

    /// Permanently remove a user
    async fn delete_user(&self, id: i32) -> AppResult<()>;
}

/// Concrete implementation of UserService over a unit-of-work factory.
pub struct UserManager {
    uow: Arc<dyn UnitOfWorkFactory>,
    max_page_size: u64,
}

impl UserManager {
    /// Create new user service instance with a storage driver
    pub fn new(uow: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self {
            uow,
            max_page_size: MAX_PAGE_SIZE,
        }
    }

    pub fn with_max_page_size(mut self, max_page_size: u64) -> Self {
        self.max_page_size = max_page_size;
        self
    }
}

#[async_trait]
impl UserService for UserManager {
    async fn create_user(&self, cmd: CreateUser) -> AppResult<User> {
        let new_user = NewUser::try_from(cmd)?;

        // Advisory only: the unique constraints still decide a concurrent race
        let user = with_unit_of_work!(self.uow.as_ref(), TransactionMode::ReadWrite, |users| {
            if users.exists_by_username(new_user.username()).await? {
                return Err(AppError::duplicate_user(new_user.username()));
            }
            if users.exists_by_email(new_user.email()).await? {
                return Err(AppError::duplicate_user(new_user.email()));
            }
            users.add(new_user).await
        })?;

        info!(user_id = user.id, "user created");
        Ok(user)
    }

    async fn get_user(&self, id: i32) -> AppResult<User> {
        let users = self.uow.reader().await?;
        users.get_by_id(id).await?.ok_or_not_found()
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<User> {
        let users = self.uow.reader().await?;
        users.get_by_username(username).await?.ok_or_not_found()
    }

    async fn list_users(&self, page: PageRequest) -> AppResult<Page<User>> {
        let page = page.capped(self.max_page_size);

        let users = self.uow.reader().await?;
        let (items, total) = users.list_paginated(page).await?;

        Ok(Page::new(items, total, page))
    }

    async fn update_user(&self, id: i32, cmd: UpdateUser) -> AppResult<User> {
        cmd.validate()?;

        with_unit_of_work!(self.uow.as_ref(), TransactionMode::ReadWrite, |users| {
            let user = users.get_by_id(id).await?.ok_or_not_found()?;
            match cmd.full_name {
                Some(full_name) => {
                    let updated = user.change_full_name(full_name)?;
                    users.update(&updated).await
                }
                None => Ok(user),
            }
        })
    }

    async fn delete_user(&self, id: i32) -> AppResult<()> {
        // NotFound is raised inside the unit so it rolls back
        with_unit_of_work!(self.uow.as_ref(), TransactionMode::ReadWrite, |users| {
            if users.delete(id).await? {
                Ok(())
            } else {
                Err(AppError::NotFound)
            }
        })?;

        info!(user_id = id, "user deleted");
        Ok(())
    }
}
