pub mod repository;
pub mod types;

pub use repository::{batch_window, SessionUnitsExportRepository, UnitsExportRepository};
pub use types::{UnitsCompleteExport, UnitsCompleteExportRow};
