//! One run of the export: trigger the procedure, resolve the latest batch,
//! write its partitions.

use crate::config::Config;
use crate::domains::export::{ensure_output_dir, export_batch, PartitionWriter};
use crate::domains::units::UnitsExportRepository;
use crate::errors::ServiceResult;

/// Runs the export once and returns the affected-row count reported by the
/// stored procedure, or 0 when there was nothing to export.
pub async fn run<R, W>(config: &Config, repository: &R, writer: &W) -> ServiceResult<i64>
where
    R: UnitsExportRepository + ?Sized,
    W: PartitionWriter,
{
    ensure_output_dir(&config.csv_folder_path)?;

    let affected_rows = repository
        .run_stored_procedure(Some(config.schema_name.as_str()), Some(config.procedure_name.as_str()))
        .await?;
    log::info!("Stored procedure executed successfully");
    log::info!("Number of affected rows: {}", affected_rows);

    if affected_rows <= 0 {
        log::info!("No data changes - exiting");
        return Ok(0);
    }

    let Some(latest) = repository.find_latest().await? else {
        log::warn!("No UnitsCompleteExport records found");
        return Ok(0);
    };
    let Some(batch_timestamp) = latest.date_created else {
        log::warn!("Latest UnitsCompleteExport record {} has no creation date", latest.export_id);
        return Ok(0);
    };

    let units = repository.find_by_batch(batch_timestamp).await?;
    log::info!("Fetched {} completed units", units.len());

    let summary = export_batch(
        writer,
        &config.csv_folder_path,
        &units,
        batch_timestamp,
        &config.partitions,
    )?;
    log::info!(
        "Total processed records: {} in {} files",
        summary.total_records,
        summary.files.len()
    );

    Ok(affected_rows)
}
