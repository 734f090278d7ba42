// ⚠️ Error types for the normalization pass
//
// Coercion failures never show up here: they are plain `None` values inside
// the reconciler and always fall through to the next alias or default.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure raised by the storage collaborator (load, persist, sweep)
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Invalid field path: {0}")]
    InvalidFieldPath(String),
}

/// A canonical-schema constraint violated by a reconciled record
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("record {record_id}: {field} {constraint}")]
pub struct ValidationError {
    pub record_id: String,
    pub field: String,
    pub constraint: String,
}

impl ValidationError {
    pub fn new(record_id: &str, field: &str, constraint: impl Into<String>) -> Self {
        ValidationError {
            record_id: record_id.to_string(),
            field: field.to_string(),
            constraint: constraint.into(),
        }
    }
}

/// Errors that abort a whole pass
#[derive(Error, Debug)]
pub enum MigrationError {
    /// Nothing can be processed if the initial bulk read fails
    #[error("failed to load records: {0}")]
    Load(#[source] StorageError),
}

/// Problems reading or checking a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("abc", "foundingYear", "must be >= 1600");
        assert_eq!(err.to_string(), "record abc: foundingYear must be >= 1600");
    }

    #[test]
    fn test_storage_error_from_serde() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: StorageError = parse_err.into();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn test_migration_error_keeps_source() {
        let err = MigrationError::Load(StorageError::NotFound("brands".to_string()));
        assert!(err.to_string().contains("failed to load records"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
