use crate::errors::ValidationError;
use regex::Regex;
use std::sync::OnceLock;

/// Longest identifier SQL Server accepts (sysname).
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

fn identifier_regex() -> &'static Regex {
    static IDENTIFIER_REGEX: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap())
}

/// Returns true when `value` can be spliced into a bracketed SQL identifier
/// without quoting concerns.
pub fn is_valid_identifier(value: &str) -> bool {
    value.len() <= MAX_IDENTIFIER_LENGTH && identifier_regex().is_match(value)
}

/// Validates the schema and procedure names used to build an `EXEC` statement.
///
/// Both names must be present and non-empty before their format is checked, so
/// a missing name is always reported as missing rather than malformed.
pub fn validate_procedure_identifiers<'a>(
    schema: Option<&'a str>,
    procedure_name: Option<&'a str>,
) -> Result<(&'a str, &'a str), ValidationError> {
    let (schema, procedure_name) = match (schema, procedure_name) {
        (Some(s), Some(p)) if !s.is_empty() && !p.is_empty() => (s, p),
        _ => return Err(ValidationError::MissingProcedure),
    };

    if !is_valid_identifier(schema) || !is_valid_identifier(procedure_name) {
        return Err(ValidationError::InvalidProcedure {
            schema: schema.to_string(),
            procedure: procedure_name.to_string(),
        });
    }

    Ok((schema, procedure_name))
}

/// Unwraps a mandatory column value, naming the column when it is absent.
pub fn required<T>(field: &str, value: Option<T>) -> Result<T, ValidationError> {
    value.ok_or_else(|| ValidationError::required(field))
}

/// Like [`required`], but also rejects blank strings.
pub fn required_text(field: &str, value: Option<String>) -> Result<String, ValidationError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ValidationError::required(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("dbo"));
        assert!(is_valid_identifier("_staging"));
        assert!(is_valid_identifier("ValidProcedure2"));
        assert!(!is_valid_identifier("2fast"));
        assert!(!is_valid_identifier("user-data"));
        assert!(!is_valid_identifier("dbo].[x"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH + 1)));
    }

    #[test]
    fn test_missing_procedure_identifiers() {
        assert_eq!(
            validate_procedure_identifiers(None, Some("ValidProcedure")),
            Err(ValidationError::MissingProcedure)
        );
        assert_eq!(
            validate_procedure_identifiers(Some("ValidSchema"), None),
            Err(ValidationError::MissingProcedure)
        );
        assert_eq!(
            validate_procedure_identifiers(Some(""), Some("ValidProcedure")),
            Err(ValidationError::MissingProcedure)
        );
    }

    #[test]
    fn test_injection_attempts_are_rejected() {
        let err = validate_procedure_identifiers(Some("DROP TABLE user-data; --"), Some("ValidProcedure"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid schema or procedure name");

        assert!(validate_procedure_identifiers(Some("ValidSchema"), Some("DROP TABLE user-data; --")).is_err());
    }

    #[test]
    fn test_required_values() {
        assert_eq!(required("job_number", Some(5)), Ok(5));
        assert_eq!(required::<i32>("job_number", None), Err(ValidationError::required("job_number")));
        assert!(required_text("phase_number", Some("   ".to_string())).is_err());
        assert_eq!(required_text("phase_number", Some("P1".to_string())), Ok("P1".to_string()));
    }
}
