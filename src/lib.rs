// Public modules
pub mod config;
pub mod database;
pub mod domains;
pub mod errors;
pub mod job;
pub mod validation;

pub use config::{Config, ServerAddress};
pub use database::{MssqlSessionProvider, Session, SessionProvider};
pub use domains::units::{SessionUnitsExportRepository, UnitsExportRepository};
pub use errors::{ServiceError, ServiceResult};
pub use job::run;
