//! SeaORM-backed user repository.

use std::ops::Deref;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use common::{AppError, AppResult, PageRequest};
use domain::{NewUser, User};

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use super::UserRepository;

/// User repository running SeaORM entity queries through `C`.
///
/// `C` is an `Arc<DatabaseConnection>` for pool-backed reads or a
/// `Box<DatabaseTransaction>` inside a unit of work.
pub struct OrmUserRepository<C> {
    conn: C,
}

impl<C> OrmUserRepository<C>
where
    C: Deref,
    C::Target: ConnectionTrait + Sized,
{
    /// Create new repository instance
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    /// Give back the underlying connection or transaction handle
    pub fn into_inner(self) -> C {
        self.conn
    }

    fn db(&self) -> &C::Target {
        &self.conn
    }
}

#[async_trait]
impl<C> UserRepository for OrmUserRepository<C>
where
    C: Deref + Send + Sync,
    C::Target: ConnectionTrait + Sized,
{
    async fn add(&self, user: NewUser) -> AppResult<User> {
        // id and created_at come from the column defaults
        let active_model = ActiveModel {
            username: Set(user.username().to_string()),
            email: Set(user.email().to_string()),
            full_name: Set(user.full_name().map(str::to_string)),
            ..Default::default()
        };

        let model = active_model.insert(self.db()).await?;
        Ok(User::from(model))
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(id).one(self.db()).await?;

        Ok(result.map(User::from))
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(self.db())
            .await?;

        Ok(result.map(User::from))
    }

    async fn exists_by_username(&self, username: &str) -> AppResult<bool> {
        let count = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .count(self.db())
            .await?;

        Ok(count > 0)
    }

    async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        let count = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .count(self.db())
            .await?;

        Ok(count > 0)
    }

    async fn list_paginated(&self, page: PageRequest) -> AppResult<(Vec<User>, u64)> {
        let total = UserEntity::find().count(self.db()).await?;

        let models = UserEntity::find()
            .order_by_asc(user::Column::Id)
            .offset(page.offset)
            .limit(page.limit)
            .all(self.db())
            .await?;

        Ok((models.into_iter().map(User::from).collect(), total))
    }

    async fn update(&self, user: &User) -> AppResult<User> {
        let active = ActiveModel {
            id: Unchanged(user.id),
            full_name: Set(user.full_name.clone()),
            ..Default::default()
        };

        match active.update(self.db()).await {
            Ok(model) => Ok(User::from(model)),
            Err(DbErr::RecordNotUpdated) => Err(AppError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = UserEntity::delete_by_id(id).exec(self.db()).await?;

        Ok(result.rows_affected > 0)
    }
}
