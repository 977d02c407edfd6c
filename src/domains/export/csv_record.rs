use crate::domains::units::types::UnitsCompleteExport;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// Trait for types that can be exported to CSV
pub trait CsvRecord {
    /// Serialized shape of one CSV row; its fields must follow `headers()`.
    type Row: Serialize;

    /// Get CSV headers for this type
    fn headers() -> Vec<&'static str>;

    /// Convert to CSV row
    fn to_csv(&self) -> Self::Row;
}

/// One exported line. The flag columns are internal: they drive partitioning
/// but are never written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitsCsvRow {
    pub job_date: NaiveDate,
    pub job_number: String,
    pub phase_number: String,
    pub category_number: String,
    pub unit_change: Decimal,
    pub notes: String,
    pub cost_code: String,
}

impl CsvRecord for UnitsCompleteExport {
    type Row = UnitsCsvRow;

    fn headers() -> Vec<&'static str> {
        vec![
            "job_date",
            "job_number",
            "phase_number",
            "category_number",
            "unit_change",
            "notes",
            "cost_code",
        ]
    }

    fn to_csv(&self) -> UnitsCsvRow {
        UnitsCsvRow {
            job_date: self.job_date,
            job_number: self.job_number.clone(),
            phase_number: self.phase_number.clone(),
            category_number: self.category_number.clone(),
            unit_change: self.unit_change,
            notes: self.notes(),
            cost_code: self.cost_code(),
        }
    }
}
