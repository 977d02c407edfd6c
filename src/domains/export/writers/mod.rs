pub mod csv_writer;

pub use csv_writer::{ensure_output_dir, CsvPartitionWriter, PartitionWriter};
