//! Unit of Work pattern implementation.
//!
//! A unit of work is one database transaction plus the repositories bound to
//! it. It moves `Idle -> Active` when a driver hands it out and ends in
//! exactly one of `Committed` or `RolledBack`:
//! - [`UnitOfWork::commit`] and [`UnitOfWork::rollback`] consume the unit,
//!   so a finished unit cannot be reused
//! - dropping an active unit (for example when the owning task is
//!   cancelled) rolls the transaction back and returns the connection to the
//!   pool
//!
//! Use cases normally go through [`run_in_unit_of_work`], which commits on
//! success and rolls back on failure.

use std::fmt;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::{debug, error, warn};

use common::{AppResult, DriverKind};

use crate::repository::UserRepository;

/// Transaction access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    ReadOnly,
    ReadWrite,
}

impl TransactionMode {
    pub fn as_sql(&self) -> &'static str {
        match self {
            TransactionMode::ReadOnly => "READ ONLY",
            TransactionMode::ReadWrite => "READ WRITE",
        }
    }
}

impl fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionMode::ReadOnly => write!(f, "readonly"),
            TransactionMode::ReadWrite => write!(f, "writable"),
        }
    }
}

/// An active transaction with repository access.
///
/// All repository operations performed through [`UnitOfWork::users`] are
/// part of the same database transaction.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// User repository bound to this transaction
    fn users(&self) -> &dyn UserRepository;

    /// Persist all writes atomically and release the connection
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// Discard all writes and release the connection
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Storage driver capability: hands out units of work and read handles.
///
/// Chosen once at startup and injected into the application service, so
/// business logic never branches on which driver is in use.
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    /// Which driver backs this factory
    fn kind(&self) -> DriverKind;

    /// Start a new unit of work
    async fn begin(&self, mode: TransactionMode) -> AppResult<Box<dyn UnitOfWork>>;

    /// Repository for read-only use cases, without a unit of work
    async fn reader(&self) -> AppResult<Box<dyn UserRepository>>;

    /// Check connectivity with a trivial query
    async fn ping(&self) -> AppResult<()>;

    /// Drain the connection pool(s)
    async fn close(&self) -> AppResult<()>;
}

/// Execute a closure within a unit of work.
///
/// The transaction is committed when the closure succeeds and rolled back
/// when it fails; the closure's error is always the one returned. A failed
/// commit is reported as the error instead.
pub async fn run_in_unit_of_work<F, T>(
    factory: &dyn UnitOfWorkFactory,
    mode: TransactionMode,
    f: F,
) -> AppResult<T>
where
    F: for<'a> FnOnce(&'a dyn UserRepository) -> BoxFuture<'a, AppResult<T>> + Send,
    T: Send,
{
    let driver = factory.kind();
    let uow = factory.begin(mode).await?;
    debug!(%driver, %mode, "unit of work started");

    let outcome = f(uow.users()).await;

    match outcome {
        Ok(value) => {
            uow.commit().await?;
            debug!(%driver, "unit of work committed");
            Ok(value)
        }
        Err(err) => {
            warn!(%driver, code = err.code(), "rolling back unit of work");
            if let Err(rollback_err) = uow.rollback().await {
                error!(%driver, "Transaction rollback failed: {:?}", rollback_err);
            }
            Err(err)
        }
    }
}

/// Simpler API for executing transactional operations.
///
/// This helper macro reduces boilerplate when using units of work.
#[macro_export]
macro_rules! with_unit_of_work {
    ($factory:expr, $mode:expr, |$users:ident| $body:expr) => {
        $crate::infra::run_in_unit_of_work($factory, $mode, |$users| {
            Box::pin(async move { $body })
        })
        .await
    };
}
