//! Session management for the SQL Server store.
//!
//! Business logic never touches a connection directly. It asks a
//! [`SessionProvider`] for a [`Session`] through [`in_session`], which commits
//! when the work succeeds, rolls back when it fails, and closes the connection
//! on both paths.

use crate::domains::units::types::UnitsCompleteExportRow;
use crate::errors::{DbResult, DomainResult};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use futures::future::BoxFuture;

pub mod mssql;
#[cfg(test)]
pub(crate) mod testing;

pub use mssql::MssqlSessionProvider;

/// A transactional database session. A transaction is open from the moment
/// the session is handed out until `commit` or `rollback`.
#[async_trait]
pub trait Session: Send {
    /// Executes `statement` and returns the first column of its first row.
    async fn execute_scalar(&mut self, statement: &str) -> DbResult<Option<i64>>;

    /// The most recently created export row, by `date_created`.
    async fn latest_units_export(&mut self) -> DbResult<Option<UnitsCompleteExportRow>>;

    /// All export rows with `start <= date_created <= end`.
    async fn units_created_between(
        &mut self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> DbResult<Vec<UnitsCompleteExportRow>>;

    async fn commit(&mut self) -> DbResult<()>;

    async fn rollback(&mut self) -> DbResult<()>;

    async fn close(self: Box<Self>) -> DbResult<()>;
}

/// Hands out fresh sessions.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn open(&self) -> DbResult<Box<dyn Session>>;
}

/// Runs `work` inside a new session.
///
/// The session is committed if `work` succeeds and rolled back otherwise, then
/// closed either way. Errors from rollback or close are logged; the error
/// returned is always the first one that happened.
pub async fn in_session<P, T, F>(provider: &P, work: F) -> DomainResult<T>
where
    P: SessionProvider + ?Sized,
    T: Send,
    F: for<'s> FnOnce(&'s mut dyn Session) -> BoxFuture<'s, DomainResult<T>>,
{
    let mut session = provider.open().await.map_err(|e| {
        log::error!("Failed to open database session: {}", e);
        e
    })?;

    let outcome = match work(session.as_mut()).await {
        Ok(value) => session.commit().await.map(|_| value).map_err(Into::into),
        Err(e) => Err(e),
    };

    if let Err(e) = &outcome {
        log::error!("Rolling back database session: {}", e);
        if let Err(rollback_err) = session.rollback().await {
            log::error!("Rollback failed: {}", rollback_err);
        }
    }

    if let Err(close_err) = session.close().await {
        log::warn!("Failed to close database session: {}", close_err);
    }

    outcome
}
