// ⚖️ Field Reconciler - legacy aliases → canonical values
//
// Per field, in order:
//   1. keep the canonical value if it coerces to the target type
//   2. else adopt the first legacy alias that coerces
//   3. else apply the field default (name/location have none)
//
// Numeric fields treat a present zero as missing (see `coerce::is_missing`),
// so `numberOfLocations: 0` becomes 1 instead of failing validation.

use crate::coerce::{coerce_nonzero_integer, coerce_positive_integer, coerce_string, is_missing};
use crate::db::RawRecord;
use crate::schema::{CanonicalField, MIN_SITE_COUNT};
use crate::shape::{LegacyAlias, RecordShape};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_FOUNDING_YEAR: i64 = 1960;
pub const DEFAULT_SITE_COUNT: i64 = MIN_SITE_COUNT;

const NAME_ALIASES: &[LegacyAlias] = &[LegacyAlias::ContainerName];
const LOCATION_ALIASES: &[LegacyAlias] = &[LegacyAlias::HqAddress];
const FOUNDING_YEAR_ALIASES: &[LegacyAlias] =
    &[LegacyAlias::YearsFounded, LegacyAlias::YearCreated];

// ============================================================================
// RESOLUTION
// ============================================================================

/// Why a canonical value was not kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    /// Absent, null, blank or zero
    Missing,
    /// Present but not coercible to the target type
    Invalid,
}

/// How a field's final value was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Kept,
    Alias { alias: LegacyAlias, rejected: Rejection },
    Defaulted { rejected: Rejection },
    /// No value and no default; the record will fail validation
    Unresolved { rejected: Rejection },
}

impl Resolution {
    pub fn is_default(&self) -> bool {
        matches!(self, Resolution::Defaulted { .. })
    }

    pub fn is_alias(&self) -> bool {
        matches!(self, Resolution::Alias { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOutcome {
    pub field: CanonicalField,
    pub resolution: Resolution,
}

/// Canonical values produced for one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciled {
    pub id: String,
    pub name: Option<String>,
    pub founding_year: i64,
    pub location: Option<String>,
    pub site_count: i64,
    pub legacy_shape: bool,
    pub outcomes: Vec<FieldOutcome>,
}

impl Reconciled {
    /// Value to write under the field's canonical key; `None` means leave it unset
    pub fn value(&self, field: CanonicalField) -> Option<Value> {
        match field {
            CanonicalField::Name => self.name.clone().map(Value::String),
            CanonicalField::FoundingYear => Some(Value::from(self.founding_year)),
            CanonicalField::Location => self.location.clone().map(Value::String),
            CanonicalField::SiteCount => Some(Value::from(self.site_count)),
        }
    }

    pub fn resolution(&self, field: CanonicalField) -> Option<Resolution> {
        self.outcomes
            .iter()
            .find(|o| o.field == field)
            .map(|o| o.resolution)
    }

    pub fn defaulted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.resolution.is_default()).count()
    }

    pub fn alias_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.resolution.is_alias()).count()
    }

    pub fn defaulted_fields(&self) -> Vec<CanonicalField> {
        self.outcomes
            .iter()
            .filter(|o| o.resolution.is_default())
            .map(|o| o.field)
            .collect()
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePolicy {
    pub fallback_founding_year: i64,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        ReconcilePolicy {
            fallback_founding_year: DEFAULT_FOUNDING_YEAR,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    policy: ReconcilePolicy,
}

impl Reconciler {
    pub fn new(policy: ReconcilePolicy) -> Self {
        Reconciler { policy }
    }

    pub fn reconcile(&self, record: &RawRecord) -> Reconciled {
        let shape = RecordShape::of(&record.document);
        let mut outcomes = Vec::with_capacity(CanonicalField::ALL.len());

        let (name, resolution) =
            resolve(&shape, CanonicalField::Name, NAME_ALIASES, coerce_string, None);
        outcomes.push(FieldOutcome { field: CanonicalField::Name, resolution });

        let (founding_year, resolution) = resolve(
            &shape,
            CanonicalField::FoundingYear,
            FOUNDING_YEAR_ALIASES,
            coerce_nonzero_integer,
            Some(self.policy.fallback_founding_year),
        );
        outcomes.push(FieldOutcome { field: CanonicalField::FoundingYear, resolution });

        let (location, resolution) =
            resolve(&shape, CanonicalField::Location, LOCATION_ALIASES, coerce_string, None);
        outcomes.push(FieldOutcome { field: CanonicalField::Location, resolution });

        let (site_count, resolution) = resolve(
            &shape,
            CanonicalField::SiteCount,
            &[],
            coerce_positive_integer,
            Some(DEFAULT_SITE_COUNT),
        );
        outcomes.push(FieldOutcome { field: CanonicalField::SiteCount, resolution });

        Reconciled {
            id: record.id.clone(),
            name,
            // Both numeric fields carry a default, so they always resolve
            founding_year: founding_year.unwrap_or(self.policy.fallback_founding_year),
            location,
            site_count: site_count.unwrap_or(DEFAULT_SITE_COUNT),
            legacy_shape: shape.is_legacy(),
            outcomes,
        }
    }
}

fn resolve<T>(
    shape: &RecordShape,
    field: CanonicalField,
    aliases: &[LegacyAlias],
    coerce: fn(&Value) -> Option<T>,
    default: Option<T>,
) -> (Option<T>, Resolution) {
    let current = shape.canonical().get(field);
    if let Some(value) = current.and_then(coerce) {
        return (Some(value), Resolution::Kept);
    }

    let rejected = if is_missing(current) {
        Rejection::Missing
    } else {
        Rejection::Invalid
    };

    if let Some(legacy) = shape.legacy() {
        for alias in aliases {
            if let Some(value) = legacy.get(*alias).and_then(coerce) {
                return (Some(value), Resolution::Alias { alias: *alias, rejected });
            }
        }
    }

    match default {
        Some(value) => (Some(value), Resolution::Defaulted { rejected }),
        None => (None, Resolution::Unresolved { rejected }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn record(value: Value) -> RawRecord {
        let document: Map<String, Value> = value.as_object().cloned().unwrap();
        RawRecord::new(document)
    }

    fn reconcile(value: Value) -> Reconciled {
        Reconciler::default().reconcile(&record(value))
    }

    #[test]
    fn test_end_to_end_legacy_record() {
        let out = reconcile(json!({
            "brand": {"name": "Acme"},
            "hqAddress": "Metropolis",
            "yearsFounded": "1923",
            "numberOfLocations": "0"
        }));

        assert_eq!(out.name.as_deref(), Some("Acme"));
        assert_eq!(out.location.as_deref(), Some("Metropolis"));
        assert_eq!(out.founding_year, 1923);
        assert_eq!(out.site_count, 1);
        assert!(out.legacy_shape);
        assert_eq!(out.defaulted_fields(), vec![CanonicalField::SiteCount]);
        assert_eq!(out.alias_count(), 3);
    }

    #[test]
    fn test_canonical_value_wins_over_alias() {
        let out = reconcile(json!({
            "brandName": "Canon",
            "brand": {"name": "Legacy"},
            "headquarters": "Paris",
            "hqAddress": "Lyon",
            "yearFounded": 1901,
            "yearsFounded": 1850,
            "numberOfLocations": 12
        }));

        assert_eq!(out.name.as_deref(), Some("Canon"));
        assert_eq!(out.location.as_deref(), Some("Paris"));
        assert_eq!(out.founding_year, 1901);
        assert_eq!(out.site_count, 12);
        assert!(out.outcomes.iter().all(|o| o.resolution == Resolution::Kept));
    }

    #[test]
    fn test_founding_year_first_alias_wins() {
        let out = reconcile(json!({
            "yearsFounded": "1901",
            "yearCreated": 1950
        }));

        assert_eq!(out.founding_year, 1901);
        assert_eq!(
            out.resolution(CanonicalField::FoundingYear),
            Some(Resolution::Alias {
                alias: LegacyAlias::YearsFounded,
                rejected: Rejection::Missing
            })
        );
    }

    #[test]
    fn test_founding_year_second_alias() {
        let out = reconcile(json!({
            "brandName": "Acme",
            "headquarters": "Metropolis",
            "yearCreated": "1988"
        }));

        assert_eq!(out.founding_year, 1988);
        assert_eq!(
            out.resolution(CanonicalField::FoundingYear),
            Some(Resolution::Alias {
                alias: LegacyAlias::YearCreated,
                rejected: Rejection::Missing
            })
        );
    }

    #[test]
    fn test_founding_year_skips_uncoercible_first_alias() {
        let out = reconcile(json!({
            "yearsFounded": "long ago",
            "yearCreated": 1875
        }));

        assert_eq!(out.founding_year, 1875);
    }

    #[test]
    fn test_founding_year_zero_is_missing() {
        let out = reconcile(json!({"yearFounded": 0, "yearsFounded": 1999}));
        assert_eq!(out.founding_year, 1999);

        let out = reconcile(json!({"yearFounded": "0"}));
        assert_eq!(out.founding_year, DEFAULT_FOUNDING_YEAR);
        assert_eq!(
            out.resolution(CanonicalField::FoundingYear),
            Some(Resolution::Defaulted { rejected: Rejection::Missing })
        );
    }

    #[test]
    fn test_founding_year_out_of_range_is_kept() {
        // Bounds are the validator's job, not the reconciler's
        let out = reconcile(json!({"yearFounded": 1500, "yearsFounded": 1923}));
        assert_eq!(out.founding_year, 1500);
    }

    #[test]
    fn test_founding_year_custom_fallback() {
        let reconciler = Reconciler::new(ReconcilePolicy {
            fallback_founding_year: 2000,
        });
        let out = reconciler.reconcile(&record(json!({"yearFounded": "n/a"})));

        assert_eq!(out.founding_year, 2000);
        assert_eq!(
            out.resolution(CanonicalField::FoundingYear),
            Some(Resolution::Defaulted { rejected: Rejection::Invalid })
        );
    }

    #[test]
    fn test_site_count_defaults() {
        assert_eq!(reconcile(json!({})).site_count, 1);
        assert_eq!(reconcile(json!({"numberOfLocations": 0})).site_count, 1);
        assert_eq!(reconcile(json!({"numberOfLocations": -4})).site_count, 1);
        assert_eq!(reconcile(json!({"numberOfLocations": "many"})).site_count, 1);
        assert_eq!(reconcile(json!({"numberOfLocations": "250"})).site_count, 250);
    }

    #[test]
    fn test_name_has_no_default() {
        let out = reconcile(json!({"brand": {"name": 42}, "hqAddress": "  "}));

        assert_eq!(out.name, None);
        assert_eq!(out.location, None);
        assert_eq!(
            out.resolution(CanonicalField::Name),
            Some(Resolution::Unresolved { rejected: Rejection::Missing })
        );
        assert_eq!(out.value(CanonicalField::Name), None);
    }

    #[test]
    fn test_name_is_trimmed() {
        let out = reconcile(json!({"brandName": "  Acme  "}));
        assert_eq!(out.name.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_non_string_name_rejected_as_invalid() {
        let out = reconcile(json!({"brandName": 17, "brand": {"name": "Acme"}}));

        assert_eq!(out.name.as_deref(), Some("Acme"));
        assert_eq!(
            out.resolution(CanonicalField::Name),
            Some(Resolution::Alias {
                alias: LegacyAlias::ContainerName,
                rejected: Rejection::Invalid
            })
        );
    }

    #[test]
    fn test_identity_is_carried() {
        let raw = record(json!({"brandName": "Acme"}));
        let out = Reconciler::default().reconcile(&raw);
        assert_eq!(out.id, raw.id);
    }
}
