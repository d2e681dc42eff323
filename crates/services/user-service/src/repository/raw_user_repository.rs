//! Hand-written SQL user repository on top of SQLx.

use std::ops::DerefMut;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{FromRow, PgConnection};
use tokio::sync::Mutex;

use common::{AppError, AppResult, PageRequest};
use domain::{NewUser, User};

use super::UserRepository;

const USER_COLUMNS: &str = "id, username, email, full_name, created_at";

/// Row shape returned by every `SELECT`/`RETURNING` below
#[derive(Debug, FromRow)]
struct UserRow {
    id: i32,
    username: String,
    email: String,
    full_name: Option<String>,
    created_at: NaiveDateTime,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            full_name: row.full_name,
            created_at: row.created_at,
        }
    }
}

/// User repository issuing parameterised SQL on a single Postgres connection.
///
/// `C` is a pooled connection for reads or an open `Transaction` inside a
/// unit of work. SQLx needs exclusive access to run a query, so the handle
/// sits behind an async mutex and calls on one repository are serialised.
pub struct RawUserRepository<C> {
    conn: Mutex<C>,
}

impl<C> RawUserRepository<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    pub fn new(conn: C) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Give back the underlying connection or transaction
    pub fn into_inner(self) -> C {
        self.conn.into_inner()
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl<C> UserRepository for RawUserRepository<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn add(&self, user: NewUser) -> AppResult<User> {
        let mut conn = self.conn.lock().await;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (username, email, full_name) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user.username())
        .bind(user.email())
        .bind(user.full_name())
        .fetch_one(&mut **conn)
        .await?;

        Ok(row.into())
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Option<User>> {
        let mut conn = self.conn.lock().await;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **conn)
        .await?;

        Ok(row.map(User::from))
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let mut conn = self.conn.lock().await;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&mut **conn)
        .await?;

        Ok(row.map(User::from))
    }

    async fn exists_by_username(&self, username: &str) -> AppResult<bool> {
        let mut conn = self.conn.lock().await;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&mut **conn)
                .await?;

        Ok(exists)
    }

    async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        let mut conn = self.conn.lock().await;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&mut **conn)
            .await?;

        Ok(exists)
    }

    async fn list_paginated(&self, page: PageRequest) -> AppResult<(Vec<User>, u64)> {
        let mut conn = self.conn.lock().await;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut **conn)
            .await?;

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY id OFFSET $1 LIMIT $2",
            USER_COLUMNS
        ))
        .bind(to_i64(page.offset))
        .bind(to_i64(page.limit))
        .fetch_all(&mut **conn)
        .await?;

        let users = rows.into_iter().map(User::from).collect();
        Ok((users, u64::try_from(total).unwrap_or_default()))
    }

    async fn update(&self, user: &User) -> AppResult<User> {
        let mut conn = self.conn.lock().await;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET full_name = $2 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(user.full_name.as_deref())
        .fetch_optional(&mut **conn)
        .await?;

        row.map(User::from).ok_or(AppError::NotFound)
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut conn = self.conn.lock().await;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut **conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
