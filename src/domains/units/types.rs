use crate::errors::ValidationError;
use crate::validation::{required, required_text};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

/// Stored flag value meaning "set"; NULL and every other value mean "not set".
const FLAG_SET: i32 = 1;

/// One unit-of-work change produced by the export stored procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitsCompleteExport {
    pub export_id: i32,
    pub job_number: String,
    pub job_date: NaiveDate,
    pub phase_number: String,
    pub category_number: String,
    pub unit_change: Decimal,
    pub timesheet_id: Option<i32>,
    pub change_order_id: Option<i32>,
    pub sub_report_id: Option<i32>,
    pub vendor_name: Option<String>,
    pub date_created: Option<NaiveDateTime>,
    pub in_closed_period: Option<i32>,
    pub missing_from_budget: Option<i32>,
}

impl UnitsCompleteExport {
    /// Space-joined description of the populated reference fields, in the
    /// order timesheet, change order, sub report, vendor.
    pub fn notes(&self) -> String {
        let mut notes = Vec::new();
        if let Some(id) = self.timesheet_id.filter(|id| *id != 0) {
            notes.push(format!("Timesheet ID: {}", id));
        }
        if let Some(id) = self.change_order_id.filter(|id| *id != 0) {
            notes.push(format!("Change Order ID: {}", id));
        }
        if let Some(id) = self.sub_report_id.filter(|id| *id != 0) {
            notes.push(format!("Sub Report ID: {}", id));
        }
        if let Some(vendor) = self.vendor_name.as_deref().filter(|v| !v.is_empty()) {
            notes.push(format!("Vendor Name: {}", vendor));
        }
        notes.join(" ")
    }

    pub fn cost_code(&self) -> String {
        format!("{}.{}.{}", self.job_number, self.phase_number, self.category_number)
    }

    pub fn is_in_closed_period(&self) -> bool {
        self.in_closed_period == Some(FLAG_SET)
    }

    pub fn is_missing_from_budget(&self) -> bool {
        self.missing_from_budget == Some(FLAG_SET)
    }
}

/// Raw column values as read from `UnitsCompleteExport`, before the mandatory
/// columns are checked.
#[derive(Debug, Clone, Default)]
pub struct UnitsCompleteExportRow {
    pub export_id: Option<i32>,
    pub job_number: Option<String>,
    pub job_date: Option<NaiveDate>,
    pub phase_number: Option<String>,
    pub category_number: Option<String>,
    pub unit_change: Option<Decimal>,
    pub timesheet_id: Option<i32>,
    pub change_order_id: Option<i32>,
    pub sub_report_id: Option<i32>,
    pub vendor_name: Option<String>,
    pub date_created: Option<NaiveDateTime>,
    pub in_closed_period: Option<i32>,
    pub missing_from_budget: Option<i32>,
}

impl UnitsCompleteExportRow {
    pub fn into_entity(self) -> Result<UnitsCompleteExport, ValidationError> {
        Ok(UnitsCompleteExport {
            export_id: required("export_id", self.export_id)?,
            job_number: required_text("job_number", self.job_number)?,
            job_date: required("job_date", self.job_date)?,
            phase_number: required_text("phase_number", self.phase_number)?,
            category_number: required_text("category_number", self.category_number)?,
            unit_change: required("unit_change", self.unit_change)?,
            timesheet_id: self.timesheet_id,
            change_order_id: self.change_order_id,
            sub_report_id: self.sub_report_id,
            vendor_name: self.vendor_name,
            date_created: self.date_created,
            in_closed_period: self.in_closed_period,
            missing_from_budget: self.missing_from_budget,
        })
    }
}
