//! Schema management connection.

use std::collections::HashSet;

use sea_orm::{Database as SeaDatabase, DatabaseConnection, DbErr, EntityTrait, QueryOrder};
use sea_orm_migration::{seaql_migrations, MigratorTrait, SchemaManager};

use common::{AppError, AppResult, DatabaseConfig};

use super::migrations::Migrator;

const MIGRATION_TABLE: &str = "seaql_migrations";

/// Single writer connection used to apply and inspect migrations.
///
/// Migrations always run through SeaORM, whichever driver serves requests.
pub struct Database {
    connection: DatabaseConnection,
}

impl Database {
    /// Connect to the primary without running migrations.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let url = config
            .primary
            .connection_url()
            .map_err(|e| AppError::storage(e.to_string()))?;
        let connection = SeaDatabase::connect(url).await?;
        Ok(Self { connection })
    }

    /// Wrap an already opened connection.
    pub fn from_connection(connection: DatabaseConnection) -> Self {
        Self { connection }
    }

    /// Run pending migrations.
    pub async fn run_migrations(&self) -> Result<(), DbErr> {
        Migrator::up(&self.connection, None).await
    }

    /// Rollback the last migration.
    pub async fn rollback_migration(&self) -> Result<(), DbErr> {
        Migrator::down(&self.connection, Some(1)).await
    }

    /// List every known migration with its applied status.
    pub async fn migration_status(&self) -> Result<Vec<(String, bool)>, DbErr> {
        // The bookkeeping table does not exist before the first `up`
        let manager = SchemaManager::new(&self.connection);
        let applied: HashSet<String> = if manager.has_table(MIGRATION_TABLE).await? {
            seaql_migrations::Entity::find()
                .order_by_asc(seaql_migrations::Column::Version)
                .all(&self.connection)
                .await?
                .into_iter()
                .map(|m| m.version)
                .collect()
        } else {
            HashSet::new()
        };

        let migrations = Migrator::migrations()
            .iter()
            .map(|m| {
                let name = m.name().to_string();
                let is_applied = applied.contains(&name);
                (name, is_applied)
            })
            .collect();

        Ok(migrations)
    }

    /// Drop everything and re-apply all migrations.
    pub async fn fresh_migrations(&self) -> Result<(), DbErr> {
        Migrator::fresh(&self.connection).await
    }

    pub async fn close(self) -> Result<(), DbErr> {
        self.connection.close().await
    }
}
