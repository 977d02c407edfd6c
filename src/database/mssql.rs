use super::{Session, SessionProvider};
use crate::config::{DatabaseConfig, ServerAddress};
use crate::domains::units::types::UnitsCompleteExportRow;
use crate::errors::{ConfigError, DbError, DbResult};
use crate::validation::is_valid_identifier;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, Row, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

const UNITS_COLUMNS: &str = "export_id, job_number, job_date, phase_number, category_number, unit_change, \
     timesheet_id, change_order_id, sub_report_id, vendor_name, date_created, in_closed_period, missing_from_budget";

/// Opens one SQL Server connection per session.
#[derive(Debug, Clone)]
pub struct MssqlSessionProvider {
    config: Config,
    address: ServerAddress,
    table: String,
}

impl MssqlSessionProvider {
    /// `schema` is spliced into every query, so it is validated here.
    pub fn new(database: &DatabaseConfig, schema: &str) -> Result<Self, ConfigError> {
        if !is_valid_identifier(schema) {
            return Err(ConfigError::invalid("schema_name", "must be a valid SQL identifier"));
        }
        let address = database.address()?;

        let mut config = Config::new();
        config.host(&address.host);
        config.port(address.port_or_default());
        if let (Some(instance), None) = (&address.instance, address.port) {
            config.instance_name(instance);
        }
        config.database(&database.database);
        config.authentication(AuthMethod::sql_server(&database.username, &database.password));
        config.encryption(EncryptionLevel::Required);
        config.application_name("uc_export");
        if database.trust_cert {
            config.trust_cert();
        }

        Ok(Self {
            config,
            address,
            table: format!("[{}].[UnitsCompleteExport]", schema),
        })
    }

    /// Human-readable connection target for log and error messages.
    fn target(&self) -> String {
        match (&self.address.instance, self.address.port) {
            (Some(instance), None) => format!("{}\\{}", self.address.host, instance),
            _ => format!("{}:{}", self.address.host, self.address.port_or_default()),
        }
    }
}

#[async_trait]
impl SessionProvider for MssqlSessionProvider {
    async fn open(&self) -> DbResult<Box<dyn Session>> {
        let target = self.target();
        let tcp = match (&self.address.instance, self.address.port) {
            (Some(_), None) => TcpStream::connect_named(&self.config)
                .await
                .map_err(|e| DbError::Connection(format!("{}: {}", target, e)))?,
            _ => TcpStream::connect((self.address.host.as_str(), self.address.port_or_default()))
                .await
                .map_err(|e| DbError::Connection(format!("{}: {}", target, e)))?,
        };
        tcp.set_nodelay(true)
            .map_err(|e| DbError::Connection(format!("{}: {}", target, e)))?;

        let mut client = Client::connect(self.config.clone(), tcp.compat_write()).await?;
        client.simple_query("BEGIN TRANSACTION").await?.into_results().await?;
        log::debug!("Opened session on {}", target);

        Ok(Box::new(MssqlSession {
            client,
            table: self.table.clone(),
        }))
    }
}

struct MssqlSession {
    client: Client<Compat<TcpStream>>,
    table: String,
}

impl MssqlSession {
    async fn run(&mut self, statement: &str) -> DbResult<()> {
        self.client.simple_query(statement).await?.into_results().await?;
        Ok(())
    }
}

#[async_trait]
impl Session for MssqlSession {
    async fn execute_scalar(&mut self, statement: &str) -> DbResult<Option<i64>> {
        let row = self
            .client
            .simple_query(statement)
            .await
            .map_err(|e| DbError::Execution(e.to_string()))?
            .into_row()
            .await
            .map_err(|e| DbError::Execution(e.to_string()))?;
        match row.and_then(|r| r.into_iter().next()) {
            Some(value) => scalar_to_i64(value),
            None => Ok(None),
        }
    }

    async fn latest_units_export(&mut self) -> DbResult<Option<UnitsCompleteExportRow>> {
        let sql = format!(
            "SELECT TOP (1) {} FROM {} ORDER BY date_created DESC",
            UNITS_COLUMNS, self.table
        );
        let row = self.client.query(sql, &[]).await?.into_row().await?;
        row.as_ref().map(map_units_row).transpose()
    }

    async fn units_created_between(
        &mut self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> DbResult<Vec<UnitsCompleteExportRow>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE date_created BETWEEN @P1 AND @P2 ORDER BY export_id",
            UNITS_COLUMNS, self.table
        );
        let rows = self
            .client
            .query(sql, &[&start, &end])
            .await?
            .into_first_result()
            .await?;
        rows.iter().map(map_units_row).collect()
    }

    async fn commit(&mut self) -> DbResult<()> {
        self.run("IF @@TRANCOUNT > 0 COMMIT TRANSACTION")
            .await
            .map_err(|e| DbError::Transaction(format!("commit failed: {}", e)))
    }

    async fn rollback(&mut self) -> DbResult<()> {
        self.run("IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION")
            .await
            .map_err(|e| DbError::Transaction(format!("rollback failed: {}", e)))
    }

    async fn close(self: Box<Self>) -> DbResult<()> {
        self.client.close().await?;
        Ok(())
    }
}

fn scalar_to_i64(value: ColumnData<'static>) -> DbResult<Option<i64>> {
    let out_of_range = |v: i128| DbError::Query(format!("affected-row count {} does not fit in i64", v));
    match value {
        ColumnData::U8(v) => Ok(v.map(i64::from)),
        ColumnData::I16(v) => Ok(v.map(i64::from)),
        ColumnData::I32(v) => Ok(v.map(i64::from)),
        ColumnData::I64(v) => Ok(v),
        ColumnData::Numeric(v) => v
            .map(|n| i64::try_from(n.int_part()).map_err(|_| out_of_range(n.int_part())))
            .transpose(),
        other => Err(DbError::Query(format!(
            "expected an integer affected-row count, got {:?}",
            other
        ))),
    }
}

fn text(row: &Row, column: &str) -> DbResult<Option<String>> {
    Ok(row.try_get::<&str, _>(column)?.map(str::to_owned))
}

fn map_units_row(row: &Row) -> DbResult<UnitsCompleteExportRow> {
    Ok(UnitsCompleteExportRow {
        export_id: row.try_get::<i32, _>("export_id")?,
        job_number: text(row, "job_number")?,
        job_date: row.try_get::<NaiveDate, _>("job_date")?,
        phase_number: text(row, "phase_number")?,
        category_number: text(row, "category_number")?,
        unit_change: row.try_get::<Decimal, _>("unit_change")?,
        timesheet_id: row.try_get::<i32, _>("timesheet_id")?,
        change_order_id: row.try_get::<i32, _>("change_order_id")?,
        sub_report_id: row.try_get::<i32, _>("sub_report_id")?,
        vendor_name: text(row, "vendor_name")?,
        date_created: row.try_get::<NaiveDateTime, _>("date_created")?,
        in_closed_period: row.try_get::<i32, _>("in_closed_period")?,
        missing_from_budget: row.try_get::<i32, _>("missing_from_budget")?,
    })
}
