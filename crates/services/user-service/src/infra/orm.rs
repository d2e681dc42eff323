//! SeaORM storage driver.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    AccessMode, ConnectOptions, ConnectionTrait, Database as SeaDatabase, DatabaseConnection,
    DatabaseTransaction, Statement, TransactionTrait,
};
use tracing::info;

use common::{AppError, AppResult, ConnectionConfig, DatabaseConfig, DriverKind, IsolationLevel};

use super::unit_of_work::{TransactionMode, UnitOfWork, UnitOfWorkFactory};
use crate::repository::{OrmUserRepository, UserRepository};

/// Unit-of-work factory backed by SeaORM connection pools.
#[derive(Clone)]
pub struct OrmDriver {
    writer: Arc<DatabaseConnection>,
    reader: Arc<DatabaseConnection>,
    isolation: IsolationLevel,
    has_replica: bool,
}

impl OrmDriver {
    /// Open the writer pool, plus the replica pool when one is configured.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let writer = Arc::new(open_pool(&config.primary, config).await?);
        info!(host = %config.primary.host(), "ORM writer pool ready");

        let has_replica = config.readonly.is_some();
        let reader = match &config.readonly {
            Some(replica) => {
                let pool = open_pool(replica, config).await?;
                info!(host = %replica.host(), "ORM read replica pool ready");
                Arc::new(pool)
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

    /// Build a driver on a single already opened connection.
    pub fn from_connection(conn: DatabaseConnection, isolation: IsolationLevel) -> Self {
        let conn = Arc::new(conn);
        Self {
            reader: conn.clone(),
            writer: conn,
            isolation,
            has_replica: false,
        }
    }
}

async fn open_pool(
    target: &ConnectionConfig,
    config: &DatabaseConfig,
) -> AppResult<DatabaseConnection> {
    let url = target
        .connection_url()
        .map_err(|e| AppError::storage(e.to_string()))?;

    let mut options = ConnectOptions::new(url);
    options
        .max_connections(config.pool.max_connections())
        .min_connections(config.pool.min_connections())
        .acquire_timeout(config.pool.acquire_timeout())
        .sqlx_logging(config.sql_echo);

    Ok(SeaDatabase::connect(options).await?)
}

fn orm_isolation(level: IsolationLevel) -> sea_orm::IsolationLevel {
    match level {
        IsolationLevel::ReadCommitted => sea_orm::IsolationLevel::ReadCommitted,
        IsolationLevel::RepeatableRead => sea_orm::IsolationLevel::RepeatableRead,
        IsolationLevel::Serializable => sea_orm::IsolationLevel::Serializable,
    }
}

#[async_trait]
impl UnitOfWorkFactory for OrmDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Orm
    }

    async fn begin(&self, mode: TransactionMode) -> AppResult<Box<dyn UnitOfWork>> {
        let (conn, access) = match mode {
            TransactionMode::ReadOnly => (&self.reader, AccessMode::ReadOnly),
            TransactionMode::ReadWrite => (&self.writer, AccessMode::ReadWrite),
        };

        let txn = conn
            .begin_with_config(Some(orm_isolation(self.isolation)), Some(access))
            .await?;

        Ok(Box::new(OrmUnitOfWork {
            users: OrmUserRepository::new(Box::new(txn)),
        }))
    }

    async fn reader(&self) -> AppResult<Box<dyn UserRepository>> {
        Ok(Box::new(OrmUserRepository::new(self.reader.clone())))
    }

    async fn ping(&self) -> AppResult<()> {
        self.writer
            .execute(Statement::from_string(
                self.writer.get_database_backend(),
                "SELECT 1".to_string(),
            ))
            .await?;
        Ok(())
    }

    async fn close(&self) -> AppResult<()> {
        self.writer.close_by_ref().await?;
        if self.has_replica {
            self.reader.close_by_ref().await?;
        }
        info!("ORM pools closed");
        Ok(())
    }
}

/// Unit of work holding an open SeaORM transaction.
///
/// Dropping it without `commit` rolls the transaction back.
struct OrmUnitOfWork {
    users: OrmUserRepository<Box<DatabaseTransaction>>,
}

#[async_trait]
impl UnitOfWork for OrmUnitOfWork {
    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let txn = *self.users.into_inner();
        txn.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        let txn = *self.users.into_inner();
        txn.rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_mapping() {
        assert_eq!(
            orm_isolation(IsolationLevel::Serializable),
            sea_orm::IsolationLevel::Serializable
        );
        assert_eq!(
            orm_isolation(IsolationLevel::default()),
            sea_orm::IsolationLevel::ReadCommitted
        );
    }
}
