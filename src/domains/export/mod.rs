pub mod csv_record;
pub mod service;
pub mod types;
pub mod writers;

pub use csv_record::{CsvRecord, UnitsCsvRow};
pub use service::{base_name, export_batch, plan_partitions};
pub use types::{ExportFlag, ExportSummary, ExportedFile, Partition, PartitionKey, PartitionPolicy};
pub use writers::{ensure_output_dir, CsvPartitionWriter, PartitionWriter};
