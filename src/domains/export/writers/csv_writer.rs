use crate::domains::export::csv_record::CsvRecord;
use crate::errors::{ExportError, ExportResult};
use std::path::Path;

/// Writes one partition of records to one file.
pub trait PartitionWriter {
    /// Writes `records` to `path`, replacing any existing file, and returns
    /// the number of data rows written.
    fn write_partition<T: CsvRecord>(&self, path: &Path, records: &[&T]) -> ExportResult<usize>;
}

/// UTF-8, comma-delimited CSV file writer with a header row.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvPartitionWriter;

impl PartitionWriter for CsvPartitionWriter {
    fn write_partition<T: CsvRecord>(&self, path: &Path, records: &[&T]) -> ExportResult<usize> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|e| ExportError::csv(path, e))?;

        wtr.write_record(T::headers()).map_err(|e| ExportError::csv(path, e))?;
        for record in records {
            wtr.serialize(record.to_csv()).map_err(|e| ExportError::csv(path, e))?;
        }
        wtr.flush().map_err(|e| ExportError::io(path, e))?;

        Ok(records.len())
    }
}

/// Creates `dir` (and its parents) when it does not exist yet. Returns whether
/// it had to be created.
pub fn ensure_output_dir(dir: &Path) -> ExportResult<bool> {
    if dir.is_dir() {
        return Ok(false);
    }
    std::fs::create_dir_all(dir).map_err(|e| ExportError::io(dir, e))?;
    log::info!("CSV folder created: {}", dir.display());
    Ok(true)
}
