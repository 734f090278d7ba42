// ✅ Validator - schema gate before persistence
//
// Runs on the pruned record and is the only way to obtain a `Brand` from raw
// data, so nothing unvalidated can reach `BrandStore::persist`.

use crate::error::ValidationError;
use crate::prune::PrunedRecord;
use crate::schema::{Brand, BrandSchema, CanonicalField, FieldSpec, FieldType, ValidationRule};
use serde_json::Value;

pub struct Validator {
    schema: BrandSchema,
}

impl Validator {
    pub fn new(schema: BrandSchema) -> Self {
        Validator { schema }
    }

    pub fn schema(&self) -> &BrandSchema {
        &self.schema
    }

    /// Every violation, in schema order
    pub fn violations(&self, record: &PrunedRecord) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for key in record.document.keys() {
            if !self.schema.is_allowed_key(key) {
                errors.push(ValidationError::new(&record.id, key, "is not part of the schema"));
            }
        }

        for spec in self.schema.fields() {
            let value = record.document.get(spec.field.key());
            if let Some(error) = check_field(&record.id, spec, value) {
                errors.push(error);
            }
        }

        errors
    }

    /// Validate and build the canonical record. Reports the first violation.
    pub fn validate(&self, record: &PrunedRecord) -> Result<Brand, ValidationError> {
        if let Some(error) = self.violations(record).into_iter().next() {
            return Err(error);
        }

        let text = |field: CanonicalField| {
            record
                .document
                .get(field.key())
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };
        let integer = |field: CanonicalField| {
            record
                .document
                .get(field.key())
                .and_then(Value::as_i64)
                .unwrap_or_default()
        };

        Ok(Brand {
            id: record.id.clone(),
            name: text(CanonicalField::Name),
            founding_year: integer(CanonicalField::FoundingYear),
            location: text(CanonicalField::Location),
            site_count: integer(CanonicalField::SiteCount),
        })
    }
}

fn check_field(
    record_id: &str,
    spec: &FieldSpec,
    value: Option<&Value>,
) -> Option<ValidationError> {
    let field = spec.field.name();

    let value = match value {
        None | Some(Value::Null) => {
            return spec
                .rules
                .contains(&ValidationRule::Required)
                .then(|| ValidationError::new(record_id, field, "is required"));
        }
        Some(value) => value,
    };

    match spec.type_ {
        FieldType::String => {
            let Some(text) = value.as_str() else {
                return Some(ValidationError::new(
                    record_id,
                    field,
                    format!("must be a string (found {})", value),
                ));
            };
            for rule in &spec.rules {
                if *rule == ValidationRule::NonEmpty && text.trim().is_empty() {
                    return Some(ValidationError::new(record_id, field, "must not be empty"));
                }
            }
        }
        FieldType::Integer => {
            let Some(n) = value.as_i64() else {
                return Some(ValidationError::new(
                    record_id,
                    field,
                    format!("must be an integer (found {})", value),
                ));
            };
            for rule in &spec.rules {
                match rule {
                    ValidationRule::Range { min, max } if n < *min || n > *max => {
                        return Some(ValidationError::new(
                            record_id,
                            field,
                            format!("must be between {} and {}, got {}", min, max, n),
                        ));
                    }
                    ValidationRule::Min(min) if n < *min => {
                        return Some(ValidationError::new(
                            record_id,
                            field,
                            format!("must be >= {}, got {}", min, n),
                        ));
                    }
                    _ => {}
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pruned(value: Value) -> PrunedRecord {
        PrunedRecord {
            id: "rec-1".to_string(),
            document: value.as_object().cloned().unwrap(),
            removed_keys: Vec::new(),
        }
    }

    fn validator() -> Validator {
        Validator::new(BrandSchema::with_bounds(1600, 2024))
    }

    #[test]
    fn test_valid_record_becomes_brand() {
        let brand = validator()
            .validate(&pruned(json!({
                "brandName": "Acme",
                "yearFounded": 1923,
                "headquarters": "Metropolis",
                "numberOfLocations": 1
            })))
            .unwrap();

        assert_eq!(brand.id, "rec-1");
        assert_eq!(brand.name, "Acme");
        assert_eq!(brand.founding_year, 1923);
        assert_eq!(brand.site_count, 1);
    }

    #[test]
    fn test_founding_year_below_range() {
        let err = validator()
            .validate(&pruned(json!({
                "brandName": "Acme",
                "yearFounded": 1500,
                "headquarters": "Metropolis",
                "numberOfLocations": 1
            })))
            .unwrap_err();

        assert_eq!(err.field, "foundingYear");
        assert_eq!(err.record_id, "rec-1");
        assert!(err.constraint.contains("between 1600 and 2024"));
    }

    #[test]
    fn test_founding_year_in_future() {
        let err = validator()
            .validate(&pruned(json!({
                "brandName": "Acme",
                "yearFounded": 2025,
                "headquarters": "Metropolis",
                "numberOfLocations": 1
            })))
            .unwrap_err();
        assert_eq!(err.field, "foundingYear");
    }

    #[test]
    fn test_missing_name_is_required() {
        let err = validator()
            .validate(&pruned(json!({
                "yearFounded": 1923,
                "headquarters": "Metropolis",
                "numberOfLocations": 1
            })))
            .unwrap_err();

        assert_eq!(err.field, "name");
        assert_eq!(err.constraint, "is required");
    }

    #[test]
    fn test_numeric_name_is_a_type_error() {
        let err = validator()
            .validate(&pruned(json!({
                "brandName": 42,
                "yearFounded": 1923,
                "headquarters": "Metropolis",
                "numberOfLocations": 1
            })))
            .unwrap_err();

        assert_eq!(err.field, "name");
        assert_eq!(err.constraint, "must be a string (found 42)");
    }

    #[test]
    fn test_blank_location_rejected() {
        let err = validator()
            .validate(&pruned(json!({
                "brandName": "Acme",
                "yearFounded": 1923,
                "headquarters": "   ",
                "numberOfLocations": 1
            })))
            .unwrap_err();

        assert_eq!(err.field, "location");
        assert_eq!(err.constraint, "must not be empty");
    }

    #[test]
    fn test_site_count_minimum() {
        let err = validator()
            .validate(&pruned(json!({
                "brandName": "Acme",
                "yearFounded": 1923,
                "headquarters": "Metropolis",
                "numberOfLocations": 0
            })))
            .unwrap_err();

        assert_eq!(err.field, "siteCount");
        assert!(err.constraint.starts_with("must be >= 1"));
    }

    #[test]
    fn test_collects_all_violations() {
        let errors = validator().violations(&pruned(json!({
            "yearFounded": "1923",
            "numberOfLocations": 0,
            "brand": {}
        })));

        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["brand", "name", "foundingYear", "location", "siteCount"]);
        assert_eq!(errors[2].constraint, "must be an integer (found \"1923\")");
    }
}
