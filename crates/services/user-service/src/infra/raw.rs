//! SQLx storage driver with hand-written SQL.

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{ConnectOptions, Postgres, Transaction};
use tracing::info;

use common::{AppError, AppResult, ConnectionConfig, DatabaseConfig, DriverKind, IsolationLevel};

use super::unit_of_work::{TransactionMode, UnitOfWork, UnitOfWorkFactory};
use crate::repository::{RawUserRepository, UserRepository};

/// Unit-of-work factory backed by SQLx `PgPool`s.
#[derive(Clone)]
pub struct RawDriver {
    writer: PgPool,
    reader: PgPool,
    isolation: IsolationLevel,
    has_replica: bool,
}

impl RawDriver {
    /// Open the writer pool, plus the replica pool when one is configured.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let writer = open_pool(&config.primary, config).await?;
        info!(host = %config.primary.host(), "raw writer pool ready");

        let has_replica = config.readonly.is_some();
        let reader = match &config.readonly {
            Some(replica) => {
                let pool = open_pool(replica, config).await?;
                info!(host = %replica.host(), "raw read replica pool ready");
                pool
            }
            None => writer.clone(),
        };

        Ok(Self {
            writer,
            reader,
            isolation: config.isolation,
            has_replica,
        })
    }
}

async fn open_pool(target: &ConnectionConfig, config: &DatabaseConfig) -> AppResult<PgPool> {
    let url = target
        .connection_url()
        .map_err(|e| AppError::storage(e.to_string()))?;

    let mut options: PgConnectOptions = url.parse()?;
    if !config.sql_echo {
        options = options.disable_statement_logging();
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.pool.max_connections())
        .min_connections(config.pool.min_connections())
        .acquire_timeout(config.pool.acquire_timeout())
        .connect_with(options)
        .await?;

    Ok(pool)
}

#[async_trait]
impl UnitOfWorkFactory for RawDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Raw
    }

    async fn begin(&self, mode: TransactionMode) -> AppResult<Box<dyn UnitOfWork>> {
        let pool = match mode {
            TransactionMode::ReadOnly => &self.reader,
            TransactionMode::ReadWrite => &self.writer,
        };

        let mut txn = pool.begin().await?;
        // Must be the first statement of the transaction
        sqlx::query(&format!(
            "SET TRANSACTION ISOLATION LEVEL {} {}",
            self.isolation.as_sql(),
            mode.as_sql()
        ))
        .execute(&mut *txn)
        .await?;

        Ok(Box::new(RawUnitOfWork {
            users: RawUserRepository::new(txn),
        }))
    }

    async fn reader(&self) -> AppResult<Box<dyn UserRepository>> {
        let conn: PoolConnection<Postgres> = self.reader.acquire().await?;
        Ok(Box::new(RawUserRepository::new(conn)))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.writer).await?;
        Ok(())
    }

    async fn close(&self) -> AppResult<()> {
        self.writer.close().await;
        if self.has_replica {
            self.reader.close().await;
        }
        info!("raw pools closed");
        Ok(())
    }
}

/// Unit of work holding an open SQLx transaction.
///
/// Dropping it without `commit` rolls the transaction back.
struct RawUnitOfWork {
    users: RawUserRepository<Transaction<'static, Postgres>>,
}

#[async_trait]
impl UnitOfWork for RawUnitOfWork {
    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.users.into_inner().commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.users.into_inner().rollback().await?;
        Ok(())
    }
}
