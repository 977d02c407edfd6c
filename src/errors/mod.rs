mod error;

pub use error::{ConfigError, DbError, DomainError, ExportError, ServiceError, ValidationError};

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type for partition file writes
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
