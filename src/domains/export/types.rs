use crate::domains::units::types::UnitsCompleteExport;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Boolean attributes that can be split out into their own export file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFlag {
    MissingFromBudget,
    InClosedPeriod,
}

impl ExportFlag {
    /// Column name, also used as the file name suffix.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFlag::MissingFromBudget => "missing_from_budget",
            ExportFlag::InClosedPeriod => "in_closed_period",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ExportFlag::MissingFromBudget => "Missing budget entries",
            ExportFlag::InClosedPeriod => "Closed period entries",
        }
    }

    pub fn is_set(&self, record: &UnitsCompleteExport) -> bool {
        match self {
            ExportFlag::MissingFromBudget => record.is_missing_from_budget(),
            ExportFlag::InClosedPeriod => record.is_in_closed_period(),
        }
    }
}

impl fmt::Display for ExportFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "missing_from_budget" | "missingfrombudget" => Ok(Self::MissingFromBudget),
            "in_closed_period" | "inclosedperiod" => Ok(Self::InClosedPeriod),
            _ => Err(format!("Unknown export flag: {}", s)),
        }
    }
}

/// Which flag files are produced and whether closed-period records stay in
/// the per-date files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPolicy {
    pub flag_partitions: Vec<ExportFlag>,
    pub exclude_closed_period: bool,
}

impl Default for PartitionPolicy {
    fn default() -> Self {
        Self {
            flag_partitions: vec![ExportFlag::MissingFromBudget],
            exclude_closed_period: false,
        }
    }
}

/// What a partition is grouped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKey {
    Flag(ExportFlag),
    JobDate(chrono::NaiveDate),
}

/// A planned output file and the records that go into it.
#[derive(Debug, Clone)]
pub struct Partition<'a> {
    pub key: PartitionKey,
    pub file_name: String,
    pub description: String,
    pub records: Vec<&'a UnitsCompleteExport>,
}

/// A partition file that was written successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub description: String,
    pub rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub files: Vec<ExportedFile>,
    pub total_records: usize,
}
