// 🧬 Record shapes - canonical vs legacy views of a raw document
//
// Older records stored the same logical values under different keys. Instead
// of probing arbitrary keys while reconciling, a raw document is split once
// into the values found under canonical keys and, if any legacy key is
// present, the values found under the known legacy aliases.

use crate::schema::{CanonicalField, LEGACY_CONTAINER_KEY};
use serde_json::{Map, Value};

pub const HQ_ADDRESS_KEY: &str = "hqAddress";
pub const YEARS_FOUNDED_KEY: &str = "yearsFounded";
pub const YEAR_CREATED_KEY: &str = "yearCreated";

/// A legacy location for a canonical value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum LegacyAlias {
    /// `brand.name`, one level inside the legacy container
    ContainerName,
    HqAddress,
    YearsFounded,
    YearCreated,
}

impl LegacyAlias {
    pub fn path(&self) -> &'static str {
        match self {
            LegacyAlias::ContainerName => "brand.name",
            LegacyAlias::HqAddress => HQ_ADDRESS_KEY,
            LegacyAlias::YearsFounded => YEARS_FOUNDED_KEY,
            LegacyAlias::YearCreated => YEAR_CREATED_KEY,
        }
    }
}

impl std::fmt::Display for LegacyAlias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Values found under canonical keys, whatever their type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalValues {
    pub name: Option<Value>,
    pub founding_year: Option<Value>,
    pub location: Option<Value>,
    pub site_count: Option<Value>,
}

impl CanonicalValues {
    fn from_document(document: &Map<String, Value>) -> Self {
        let take = |field: CanonicalField| document.get(field.key()).cloned();
        CanonicalValues {
            name: take(CanonicalField::Name),
            founding_year: take(CanonicalField::FoundingYear),
            location: take(CanonicalField::Location),
            site_count: take(CanonicalField::SiteCount),
        }
    }

    pub fn get(&self, field: CanonicalField) -> Option<&Value> {
        match field {
            CanonicalField::Name => self.name.as_ref(),
            CanonicalField::FoundingYear => self.founding_year.as_ref(),
            CanonicalField::Location => self.location.as_ref(),
            CanonicalField::SiteCount => self.site_count.as_ref(),
        }
    }
}

/// Values found under legacy aliases
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyValues {
    /// The whole legacy container, whatever it holds
    pub container: Option<Value>,
    pub container_name: Option<Value>,
    pub hq_address: Option<Value>,
    pub years_founded: Option<Value>,
    pub year_created: Option<Value>,
}

impl LegacyValues {
    fn from_document(document: &Map<String, Value>) -> Option<Self> {
        let container = document.get(LEGACY_CONTAINER_KEY).cloned();
        let container_name = container
            .as_ref()
            .and_then(|c| c.as_object())
            .and_then(|c| c.get("name"))
            .cloned();

        let legacy = LegacyValues {
            container,
            container_name,
            hq_address: document.get(HQ_ADDRESS_KEY).cloned(),
            years_founded: document.get(YEARS_FOUNDED_KEY).cloned(),
            year_created: document.get(YEAR_CREATED_KEY).cloned(),
        };

        if legacy == LegacyValues::default() {
            None
        } else {
            Some(legacy)
        }
    }

    pub fn get(&self, alias: LegacyAlias) -> Option<&Value> {
        match alias {
            LegacyAlias::ContainerName => self.container_name.as_ref(),
            LegacyAlias::HqAddress => self.hq_address.as_ref(),
            LegacyAlias::YearsFounded => self.years_founded.as_ref(),
            LegacyAlias::YearCreated => self.year_created.as_ref(),
        }
    }
}

/// Tagged view of a raw document
#[derive(Debug, Clone, PartialEq)]
pub enum RecordShape {
    /// No legacy key present
    Canonical(CanonicalValues),
    /// At least one legacy key present, possibly next to canonical keys
    Legacy {
        canonical: CanonicalValues,
        legacy: LegacyValues,
    },
}

impl RecordShape {
    pub fn of(document: &Map<String, Value>) -> Self {
        let canonical = CanonicalValues::from_document(document);
        match LegacyValues::from_document(document) {
            Some(legacy) => RecordShape::Legacy { canonical, legacy },
            None => RecordShape::Canonical(canonical),
        }
    }

    pub fn canonical(&self) -> &CanonicalValues {
        match self {
            RecordShape::Canonical(canonical) => canonical,
            RecordShape::Legacy { canonical, .. } => canonical,
        }
    }

    pub fn legacy(&self) -> Option<&LegacyValues> {
        match self {
            RecordShape::Canonical(_) => None,
            RecordShape::Legacy { legacy, .. } => Some(legacy),
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, RecordShape::Legacy { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_canonical_shape() {
        let shape = RecordShape::of(&doc(json!({
            "brandName": "Acme",
            "yearFounded": 1923,
            "unrelated": true
        })));

        assert!(!shape.is_legacy());
        assert_eq!(shape.canonical().name, Some(json!("Acme")));
        assert_eq!(shape.canonical().location, None);
        assert!(shape.legacy().is_none());
    }

    #[test]
    fn test_legacy_shape_nested_name() {
        let shape = RecordShape::of(&doc(json!({
            "brand": {"name": "Acme"},
            "hqAddress": "Metropolis"
        })));

        let legacy = shape.legacy().unwrap();
        assert_eq!(legacy.get(LegacyAlias::ContainerName), Some(&json!("Acme")));
        assert_eq!(legacy.get(LegacyAlias::HqAddress), Some(&json!("Metropolis")));
        assert_eq!(legacy.get(LegacyAlias::YearCreated), None);
    }

    #[test]
    fn test_non_object_container_is_still_legacy() {
        let shape = RecordShape::of(&doc(json!({"brand": "Acme"})));

        let legacy = shape.legacy().unwrap();
        assert_eq!(legacy.container, Some(json!("Acme")));
        assert_eq!(legacy.get(LegacyAlias::ContainerName), None);
    }

    #[test]
    fn test_alias_paths() {
        assert_eq!(LegacyAlias::ContainerName.path(), "brand.name");
        assert_eq!(LegacyAlias::YearsFounded.to_string(), "yearsFounded");
    }
}
