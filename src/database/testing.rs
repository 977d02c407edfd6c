//! In-memory [`SessionProvider`] that records every call, for unit tests.

use super::{Session, SessionProvider};
use crate::domains::units::types::UnitsCompleteExportRow;
use crate::errors::{DbError, DbResult};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default, Clone)]
pub(crate) struct SessionLog {
    pub opened: usize,
    pub statements: Vec<String>,
    pub windows: Vec<(NaiveDateTime, NaiveDateTime)>,
    pub commits: usize,
    pub rollbacks: usize,
    pub closes: usize,
}

#[derive(Debug, Clone, Default)]
struct Behaviour {
    affected_rows: Option<i64>,
    rows: Vec<UnitsCompleteExportRow>,
    unreachable: bool,
    failing_execute: bool,
    failing_commit: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeDatabase {
    behaviour: Behaviour,
    log: Arc<Mutex<SessionLog>>,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_affected_rows(mut self, count: i64) -> Self {
        self.behaviour.affected_rows = Some(count);
        self
    }

    pub fn with_rows(mut self, rows: Vec<UnitsCompleteExportRow>) -> Self {
        self.behaviour.rows = rows;
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.behaviour.unreachable = true;
        self
    }

    pub fn failing_execute(mut self) -> Self {
        self.behaviour.failing_execute = true;
        self
    }

    pub fn failing_commit(mut self) -> Self {
        self.behaviour.failing_commit = true;
        self
    }

    pub fn log(&self) -> SessionLog {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionProvider for FakeDatabase {
    async fn open(&self) -> DbResult<Box<dyn Session>> {
        if self.behaviour.unreachable {
            return Err(DbError::Connection("server unreachable".to_string()));
        }
        self.log.lock().unwrap().opened += 1;
        Ok(Box::new(FakeSession {
            behaviour: self.behaviour.clone(),
            log: Arc::clone(&self.log),
        }))
    }
}

struct FakeSession {
    behaviour: Behaviour,
    log: Arc<Mutex<SessionLog>>,
}

#[async_trait]
impl Session for FakeSession {
    async fn execute_scalar(&mut self, statement: &str) -> DbResult<Option<i64>> {
        self.log.lock().unwrap().statements.push(statement.to_string());
        if self.behaviour.failing_execute {
            return Err(DbError::Execution(format!("could not run {}", statement)));
        }
        Ok(self.behaviour.affected_rows)
    }

    async fn latest_units_export(&mut self) -> DbResult<Option<UnitsCompleteExportRow>> {
        Ok(self
            .behaviour
            .rows
            .iter()
            .filter(|row| row.date_created.is_some())
            .max_by_key(|row| row.date_created)
            .cloned())
    }

    async fn units_created_between(
        &mut self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> DbResult<Vec<UnitsCompleteExportRow>> {
        self.log.lock().unwrap().windows.push((start, end));
        Ok(self
            .behaviour
            .rows
            .iter()
            .filter(|row| matches!(row.date_created, Some(ts) if ts >= start && ts <= end))
            .cloned()
            .collect())
    }

    async fn commit(&mut self) -> DbResult<()> {
        if self.behaviour.failing_commit {
            return Err(DbError::Transaction("commit rejected".to_string()));
        }
        self.log.lock().unwrap().commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> DbResult<()> {
        self.log.lock().unwrap().rollbacks += 1;
        Ok(())
    }

    async fn close(self: Box<Self>) -> DbResult<()> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}
