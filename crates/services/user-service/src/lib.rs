//! User Service Library
//!
//! User management over PostgreSQL with transaction-scoped repositories.
//! Two interchangeable storage drivers (SeaORM and raw SQLx) sit behind
//! [`infra::UnitOfWorkFactory`]; the driver is picked once at startup.

pub mod config;
pub mod infra;
pub mod repository;
pub mod service;

use std::sync::Arc;

use tracing::info;

use common::AppResult;

use crate::config::UserServiceConfig;
use crate::infra::{Database, UnitOfWorkFactory};
use crate::service::UserManager;

/// Open the pool(s) for the configured driver.
pub async fn connect_storage(
    config: &UserServiceConfig,
) -> AppResult<Arc<dyn UnitOfWorkFactory>> {
    infra::connect(config.driver, &config.database).await
}

/// Wire the application service on top of a storage driver.
pub fn build_service(
    factory: Arc<dyn UnitOfWorkFactory>,
    config: &UserServiceConfig,
) -> UserManager {
    UserManager::new(factory).with_max_page_size(config.max_page_size)
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(config: &UserServiceConfig, action: MigrateAction) -> AppResult<()> {
    let db = Database::connect(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    db.close().await?;
    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}
