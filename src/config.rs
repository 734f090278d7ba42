// ⚙️ Configuration - TOML file with CLI overrides applied on top
//
// Example `brandfix.toml`:
//
//   database = "brands.db"
//   fallback_founding_year = 1960
//   min_founding_year = 1600
//   dry_run = false

use crate::error::ConfigError;
use crate::reconcile::{ReconcilePolicy, DEFAULT_FOUNDING_YEAR};
use crate::schema::{BrandSchema, MIN_FOUNDING_YEAR};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATABASE: &str = "brands.db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    /// SQLite file holding the brand collection
    pub database: PathBuf,

    /// Year used when neither `yearFounded` nor a legacy alias yields one
    pub fallback_founding_year: i64,

    pub min_founding_year: i64,

    /// Reconcile and validate only; no writes, no sweep
    pub dry_run: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        MigrationConfig {
            database: PathBuf::from(DEFAULT_DATABASE),
            fallback_founding_year: DEFAULT_FOUNDING_YEAR,
            min_founding_year: MIN_FOUNDING_YEAR,
            dry_run: false,
        }
    }
}

impl MigrationConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: MigrationConfig = toml::from_str(raw)?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// The fallback year must itself pass validation, otherwise every
    /// defaulted record would be rejected.
    pub fn validate(&self, current_year: i64) -> Result<(), ConfigError> {
        if self.min_founding_year > current_year {
            return Err(ConfigError::Invalid(format!(
                "min_founding_year {} is after the current year {}",
                self.min_founding_year, current_year
            )));
        }

        if self.fallback_founding_year < self.min_founding_year
            || self.fallback_founding_year > current_year
        {
            return Err(ConfigError::Invalid(format!(
                "fallback_founding_year {} must be between {} and {}",
                self.fallback_founding_year, self.min_founding_year, current_year
            )));
        }

        Ok(())
    }

    pub fn schema(&self) -> BrandSchema {
        let current_year = BrandSchema::new().current_year();
        BrandSchema::with_bounds(self.min_founding_year, current_year)
    }

    pub fn policy(&self) -> ReconcilePolicy {
        ReconcilePolicy {
            fallback_founding_year: self.fallback_founding_year,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = MigrationConfig::default();
        assert_eq!(config.database, PathBuf::from("brands.db"));
        assert_eq!(config.fallback_founding_year, 1960);
        assert_eq!(config.min_founding_year, 1600);
        assert!(!config.dry_run);
        assert!(config.validate(2024).is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = MigrationConfig::from_toml_str("dry_run = true\n").unwrap();
        assert!(config.dry_run);
        assert_eq!(config.fallback_founding_year, 1960);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = MigrationConfig::from_toml_str("fallback_year = 1900\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_fallback_outside_bounds_rejected() {
        let config = MigrationConfig {
            fallback_founding_year: 1500,
            ..MigrationConfig::default()
        };
        assert!(matches!(config.validate(2024), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database = \"/tmp/other.db\"").unwrap();
        writeln!(file, "fallback_founding_year = 1970").unwrap();

        let config = MigrationConfig::load(file.path()).unwrap();

        assert_eq!(config.database, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.policy().fallback_founding_year, 1970);
        assert_eq!(config.schema().min_founding_year(), 1600);
    }

    #[test]
    fn test_load_missing_file() {
        let result = MigrationConfig::load(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
