//! Infrastructure layer: storage drivers, units of work and migrations.

mod db;
pub mod migrations;
mod orm;
mod raw;
mod unit_of_work;

use std::sync::Arc;

use common::{AppResult, DatabaseConfig, DriverKind};

pub use db::Database;
pub use migrations::Migrator;
pub use orm::OrmDriver;
pub use raw::RawDriver;
pub use unit_of_work::{run_in_unit_of_work, TransactionMode, UnitOfWork, UnitOfWorkFactory};

/// Open the pool(s) for the selected driver.
///
/// This is the only place that looks at [`DriverKind`]; everything above it
/// sees a `dyn UnitOfWorkFactory`.
pub async fn connect(
    kind: DriverKind,
    config: &DatabaseConfig,
) -> AppResult<Arc<dyn UnitOfWorkFactory>> {
    let factory: Arc<dyn UnitOfWorkFactory> = match kind {
        DriverKind::Orm => Arc::new(OrmDriver::connect(config).await?),
        DriverKind::Raw => Arc::new(RawDriver::connect(config).await?),
    };
    tracing::info!(driver = %kind, isolation = ?config.isolation, "storage driver connected");
    Ok(factory)
}
