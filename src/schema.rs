// 📐 Shape Layer - Canonical Brand Schema
// The single authoritative target shape for persisted brand records

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Storage-owned keys. Allowed on a record, never written by the engine.
pub const ID_KEY: &str = "_id";
pub const CREATED_AT_KEY: &str = "createdAt";
pub const UPDATED_AT_KEY: &str = "updatedAt";

/// Nested container older records carry their name under (`brand.name`)
pub const LEGACY_CONTAINER_KEY: &str = "brand";

pub const MIN_FOUNDING_YEAR: i64 = 1600;
pub const MIN_SITE_COUNT: i64 = 1;

// ============================================================================
// CANONICAL FIELDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CanonicalField {
    Name,
    FoundingYear,
    Location,
    SiteCount,
}

impl CanonicalField {
    /// Schema order. Validation reports violations in this order.
    pub const ALL: [CanonicalField; 4] = [
        CanonicalField::Name,
        CanonicalField::FoundingYear,
        CanonicalField::Location,
        CanonicalField::SiteCount,
    ];

    /// Key under which the field is stored in a document
    pub fn key(&self) -> &'static str {
        match self {
            CanonicalField::Name => "brandName",
            CanonicalField::FoundingYear => "yearFounded",
            CanonicalField::Location => "headquarters",
            CanonicalField::SiteCount => "numberOfLocations",
        }
    }

    /// Logical name used in logs and reports
    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::Name => "name",
            CanonicalField::FoundingYear => "foundingYear",
            CanonicalField::Location => "location",
            CanonicalField::SiteCount => "siteCount",
        }
    }

    pub fn from_key(key: &str) -> Option<CanonicalField> {
        CanonicalField::ALL.into_iter().find(|f| f.key() == key)
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// FIELD SPECS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    String,
    Integer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationRule {
    Required,
    /// Non-empty after trimming
    NonEmpty,
    Range { min: i64, max: i64 },
    Min(i64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub field: CanonicalField,
    pub type_: FieldType,
    pub rules: Vec<ValidationRule>,
}

impl FieldSpec {
    fn new(field: CanonicalField, type_: FieldType) -> Self {
        FieldSpec {
            field,
            type_,
            rules: vec![ValidationRule::Required],
        }
    }

    fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }
}

/// Canonical Brand schema: field types, required status and bounds.
///
/// The upper bound of `foundingYear` is the current calendar year, captured
/// when the schema is built so a whole pass validates against one value.
#[derive(Debug, Clone)]
pub struct BrandSchema {
    fields: Vec<FieldSpec>,
    current_year: i64,
    min_founding_year: i64,
}

impl BrandSchema {
    pub fn new() -> Self {
        Self::with_bounds(MIN_FOUNDING_YEAR, Utc::now().year() as i64)
    }

    pub fn with_bounds(min_founding_year: i64, current_year: i64) -> Self {
        let fields = vec![
            FieldSpec::new(CanonicalField::Name, FieldType::String)
                .with_rule(ValidationRule::NonEmpty),
            FieldSpec::new(CanonicalField::FoundingYear, FieldType::Integer).with_rule(
                ValidationRule::Range {
                    min: min_founding_year,
                    max: current_year,
                },
            ),
            FieldSpec::new(CanonicalField::Location, FieldType::String)
                .with_rule(ValidationRule::NonEmpty),
            FieldSpec::new(CanonicalField::SiteCount, FieldType::Integer)
                .with_rule(ValidationRule::Min(MIN_SITE_COUNT)),
        ];

        BrandSchema {
            fields,
            current_year,
            min_founding_year,
        }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn spec(&self, field: CanonicalField) -> Option<&FieldSpec> {
        self.fields.iter().find(|s| s.field == field)
    }

    pub fn current_year(&self) -> i64 {
        self.current_year
    }

    pub fn min_founding_year(&self) -> i64 {
        self.min_founding_year
    }

    /// True if `key` may appear on a persisted record
    pub fn is_allowed_key(&self, key: &str) -> bool {
        CanonicalField::from_key(key).is_some()
            || key == ID_KEY
            || key == CREATED_AT_KEY
            || key == UPDATED_AT_KEY
    }

    pub fn allowed_keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = CanonicalField::ALL.iter().map(|f| f.key()).collect();
        keys.extend([ID_KEY, CREATED_AT_KEY, UPDATED_AT_KEY]);
        keys
    }
}

impl Default for BrandSchema {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// CANONICAL RECORD
// ============================================================================

/// A validated brand, ready to persist.
///
/// `id` is carried alongside the content but never serialized into the
/// document: identity and audit timestamps belong to the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    #[serde(skip)]
    pub id: String,

    #[serde(rename = "brandName")]
    pub name: String,

    #[serde(rename = "yearFounded")]
    pub founding_year: i64,

    #[serde(rename = "headquarters")]
    pub location: String,

    #[serde(rename = "numberOfLocations")]
    pub site_count: i64,
}

impl Brand {
    /// Stable fingerprint of the content fields. Identical content → identical hash.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}\u{1f}{}\u{1f}{}\u{1f}{}",
            self.name, self.founding_year, self.location, self.site_count
        ));
        format!("{:x}", hasher.finalize())
    }
}
