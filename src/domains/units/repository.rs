use crate::database::{in_session, SessionProvider};
use crate::domains::units::types::{UnitsCompleteExport, UnitsCompleteExportRow};
use crate::errors::{DomainError, DomainResult};
use crate::validation::validate_procedure_identifiers;
use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, Timelike};
use futures::FutureExt;

/// Half-width of the window that groups rows written by one procedure run.
/// `12:00:00.123456` truncates to `.123` and matches `[.121, .125]`.
pub const BATCH_TOLERANCE_MS: i64 = 2;

/// Drops the sub-millisecond part of `timestamp`.
pub fn truncate_to_millis(timestamp: NaiveDateTime) -> NaiveDateTime {
    let nanos = timestamp.nanosecond();
    let truncated = nanos - nanos % 1_000_000;
    timestamp.with_nanosecond(truncated).unwrap_or(timestamp)
}

/// Inclusive `[start, end]` range of creation timestamps treated as the same
/// batch as `reference`.
pub fn batch_window(reference: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    let center = truncate_to_millis(reference);
    let tolerance = Duration::milliseconds(BATCH_TOLERANCE_MS);
    (center - tolerance, center + tolerance)
}

/// Statement used to run the export procedure. Callers must validate both
/// identifiers first.
pub fn exec_statement(schema: &str, procedure_name: &str) -> String {
    format!("EXEC [{}].[{}]", schema, procedure_name)
}

/// Trait defining units export repository operations
#[async_trait]
pub trait UnitsExportRepository: Send + Sync {
    /// Runs `[schema].[procedure_name]` and returns the affected-row count it
    /// reports, or 0 when it returns no rows.
    ///
    /// The identifiers are validated before a session is opened; nothing is
    /// executed when they are missing or malformed.
    async fn run_stored_procedure(
        &self,
        schema: Option<&str>,
        procedure_name: Option<&str>,
    ) -> DomainResult<i64>;

    /// The most recently created export record, or `None` when the table is empty.
    async fn find_latest(&self) -> DomainResult<Option<UnitsCompleteExport>>;

    /// All records of the batch identified by `reference`, i.e. created within
    /// [`BATCH_TOLERANCE_MS`] of its millisecond-truncated value.
    async fn find_by_batch(&self, reference: NaiveDateTime) -> DomainResult<Vec<UnitsCompleteExport>>;
}

/// Session-backed implementation for UnitsExportRepository
#[derive(Debug, Clone)]
pub struct SessionUnitsExportRepository<P> {
    provider: P,
}

impl<P: SessionProvider> SessionUnitsExportRepository<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: SessionProvider> UnitsExportRepository for SessionUnitsExportRepository<P> {
    async fn run_stored_procedure(
        &self,
        schema: Option<&str>,
        procedure_name: Option<&str>,
    ) -> DomainResult<i64> {
        let (schema, procedure_name) = validate_procedure_identifiers(schema, procedure_name).map_err(|e| {
            log::error!("Refusing to call stored procedure: {}", e);
            e
        })?;
        let statement = exec_statement(schema, procedure_name);
        log::debug!("Executing {}", statement);

        in_session(&self.provider, move |session| {
            async move {
                let affected = session.execute_scalar(&statement).await.map_err(|e| {
                    log::error!("Stored procedure {} failed: {}", statement, e);
                    e
                })?;
                if affected.is_none() {
                    log::info!("No rows were returned by {}", statement);
                }
                Ok::<_, DomainError>(affected.unwrap_or(0))
            }
            .boxed()
        })
        .await
    }

    async fn find_latest(&self) -> DomainResult<Option<UnitsCompleteExport>> {
        in_session(&self.provider, |session| {
            async move {
                let row: Option<UnitsCompleteExportRow> = session.latest_units_export().await?;
                Ok::<_, DomainError>(row.map(UnitsCompleteExportRow::into_entity).transpose()?)
            }
            .boxed()
        })
        .await
    }

    async fn find_by_batch(&self, reference: NaiveDateTime) -> DomainResult<Vec<UnitsCompleteExport>> {
        let (start, end) = batch_window(reference);
        log::debug!("Fetching units created between {} and {}", start, end);

        in_session(&self.provider, move |session| {
            async move {
                let rows: Vec<UnitsCompleteExportRow> = session.units_created_between(start, end).await?;
                let units = rows
                    .into_iter()
                    .map(UnitsCompleteExportRow::into_entity)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok::<_, DomainError>(units)
            }
            .boxed()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::FakeDatabase;
    use crate::domains::units::types::fixtures::{row, timestamp};
    use crate::errors::{DbError, ValidationError};

    fn repository(db: &FakeDatabase) -> SessionUnitsExportRepository<FakeDatabase> {
        SessionUnitsExportRepository::new(db.clone())
    }

    #[tokio::test]
    async fn test_call_stored_procedure_with_valid_inputs() {
        let db = FakeDatabase::new().with_affected_rows(12);

        let affected = repository(&db)
            .run_stored_procedure(Some("ValidSchema"), Some("ValidProcedure"))
            .await
            .unwrap();

        assert_eq!(affected, 12);
        let log = db.log();
        assert_eq!(log.statements, vec!["EXEC [ValidSchema].[ValidProcedure]".to_string()]);
        assert_eq!(log.commits, 1);
        assert_eq!(log.closes, 1);
    }

    #[tokio::test]
    async fn test_procedure_without_rows_reports_zero() {
        let db = FakeDatabase::new();

        let affected = repository(&db)
            .run_stored_procedure(Some("dbo"), Some("TestProcedure"))
            .await
            .unwrap();

        assert_eq!(affected, 0);
        assert_eq!(db.log().commits, 1);
    }

    #[tokio::test]
    async fn test_missing_identifiers_never_reach_the_database() {
        let db = FakeDatabase::new();
        let repo = repository(&db);

        for (schema, procedure) in [(None, Some("ValidProcedure")), (Some("ValidSchema"), None)] {
            let err = repo.run_stored_procedure(schema, procedure).await.unwrap_err();
            assert_eq!(err.to_string(), "Validation error: Schema and procedure name must be provided.");
        }

        let log = db.log();
        assert_eq!(log.opened, 0);
        assert!(log.statements.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_identifiers_never_reach_the_database() {
        let db = FakeDatabase::new();
        let repo = repository(&db);

        let schema_err = repo
            .run_stored_procedure(Some("DROP TABLE user-data; --"), Some("ValidProcedure"))
            .await
            .unwrap_err();
        let proc_err = repo
            .run_stored_procedure(Some("ValidSchema"), Some("DROP TABLE user-data; --"))
            .await
            .unwrap_err();

        for err in [schema_err, proc_err] {
            assert!(matches!(
                err,
                DomainError::Validation(ValidationError::InvalidProcedure { .. })
            ));
        }
        assert!(db.log().statements.is_empty());
    }

    #[tokio::test]
    async fn test_failed_procedure_rolls_back() {
        let db = FakeDatabase::new().failing_execute();

        let err = repository(&db)
            .run_stored_procedure(Some("dbo"), Some("TestProcedure"))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Database(DbError::Execution(_))));
        let log = db.log();
        assert_eq!(log.commits, 0);
        assert_eq!(log.rollbacks, 1);
        assert_eq!(log.closes, 1);
    }

    #[test]
    fn test_window_truncates_to_millis() {
        let reference = timestamp(123_456);

        assert_eq!(truncate_to_millis(reference), timestamp(123_000));
        assert_eq!(batch_window(reference), (timestamp(121_000), timestamp(125_000)));
    }

    #[test]
    fn test_window_on_exact_millisecond() {
        assert_eq!(batch_window(timestamp(5_000)), (timestamp(3_000), timestamp(7_000)));
    }

    #[tokio::test]
    async fn test_find_latest_returns_latest() {
        let mut older = row(1);
        older.date_created = Some(timestamp(100_000));
        let mut newest = row(2);
        newest.date_created = Some(timestamp(900_000));
        let db = FakeDatabase::new().with_rows(vec![older, newest]);

        let latest = repository(&db).find_latest().await.unwrap().unwrap();

        assert_eq!(latest.export_id, 2);
        assert_eq!(db.log().closes, 1);
    }

    #[tokio::test]
    async fn test_find_latest_on_empty_table() {
        let db = FakeDatabase::new();
        assert!(repository(&db).find_latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_batch_filters_correctly() {
        let mut rows = Vec::new();
        for (id, micros) in [(1, 121_000), (2, 123_456), (3, 125_000), (4, 125_001), (5, 120_999)] {
            let mut r = row(id);
            r.date_created = Some(timestamp(micros));
            rows.push(r);
        }
        let db = FakeDatabase::new().with_rows(rows);

        let units = repository(&db).find_by_batch(timestamp(123_456)).await.unwrap();

        let ids: Vec<i32> = units.iter().map(|u| u.export_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(db.log().windows, vec![(timestamp(121_000), timestamp(125_000))]);
    }

    #[tokio::test]
    async fn test_find_by_batch_rejects_rows_missing_mandatory_columns() {
        let mut broken = row(1);
        broken.job_number = None;
        let db = FakeDatabase::new().with_rows(vec![broken]);

        let err = repository(&db).find_by_batch(timestamp(123_456)).await.unwrap_err();

        assert!(matches!(err, DomainError::Validation(ValidationError::Required { .. })));
        assert_eq!(db.log().rollbacks, 1);
    }
}
