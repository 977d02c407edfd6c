use crate::domains::export::types::{ExportSummary, ExportedFile, Partition, PartitionKey, PartitionPolicy};
use crate::domains::export::writers::PartitionWriter;
use crate::domains::units::types::UnitsCompleteExport;
use crate::errors::ExportResult;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::path::Path;

/// File name prefix shared by every partition of one batch.
pub fn base_name(batch_timestamp: NaiveDateTime) -> String {
    format!("UC_{}", batch_timestamp.format("%Y%m%d%H%M%S"))
}

/// Splits a batch into its output files: one per configured flag (skipped when
/// no record has the flag set), then one per job date in ascending order.
pub fn plan_partitions<'a>(
    records: &'a [UnitsCompleteExport],
    base_name: &str,
    policy: &PartitionPolicy,
) -> Vec<Partition<'a>> {
    let mut partitions = Vec::new();

    for flag in &policy.flag_partitions {
        let flagged: Vec<&UnitsCompleteExport> = records.iter().filter(|r| flag.is_set(r)).collect();
        if flagged.is_empty() {
            continue;
        }
        partitions.push(Partition {
            key: PartitionKey::Flag(*flag),
            file_name: format!("{}_{}.csv", base_name, flag.as_str()),
            description: flag.description().to_string(),
            records: flagged,
        });
    }

    let mut by_date: BTreeMap<NaiveDate, Vec<&UnitsCompleteExport>> = BTreeMap::new();
    for record in records {
        if policy.exclude_closed_period && record.is_in_closed_period() {
            continue;
        }
        by_date.entry(record.job_date).or_default().push(record);
    }

    for (job_date, group) in by_date {
        partitions.push(Partition {
            key: PartitionKey::JobDate(job_date),
            file_name: format!("{}_{}.csv", base_name, job_date.format("%Y%m%d")),
            description: format!("Job date {}", job_date),
            records: group,
        });
    }

    partitions
}

/// Writes every partition of a batch into `dir`.
///
/// Stops at the first partition that cannot be written; files written before
/// it are left in place.
pub fn export_batch<W: PartitionWriter>(
    writer: &W,
    dir: &Path,
    records: &[UnitsCompleteExport],
    batch_timestamp: NaiveDateTime,
    policy: &PartitionPolicy,
) -> ExportResult<ExportSummary> {
    let base = base_name(batch_timestamp);
    let mut summary = ExportSummary {
        files: Vec::new(),
        total_records: records.len(),
    };

    for partition in plan_partitions(records, &base, policy) {
        let path = dir.join(&partition.file_name);
        let rows = writer.write_partition(&path, &partition.records).map_err(|e| {
            log::error!("Failed to export {}: {}", partition.file_name, e);
            e
        })?;

        log::info!("Created {} ({} records) - {}", path.display(), rows, partition.description);
        summary.files.push(ExportedFile {
            path,
            description: partition.description,
            rows,
        });
    }

    Ok(summary)
}
