// ✂️ Field Pruner - drop everything the schema does not declare

use crate::db::RawRecord;
use crate::reconcile::{Reconciled, Rejection, Resolution};
use crate::schema::{BrandSchema, CanonicalField};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A record reduced to the canonical key set, ready for validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrunedRecord {
    pub id: String,
    pub document: Map<String, Value>,
    /// Keys removed from the raw document, sorted
    pub removed_keys: Vec<String>,
}

/// Overlay reconciled values on the raw document, then remove every key the
/// schema does not allow (legacy container and aliases included).
///
/// A canonical field the reconciler could not resolve is removed when it was
/// missing. An invalid canonical value is left in place so validation reports
/// the type error instead of a missing field.
pub fn prune(record: &RawRecord, reconciled: &Reconciled, schema: &BrandSchema) -> PrunedRecord {
    let mut document = record.document.clone();

    for field in CanonicalField::ALL {
        match reconciled.value(field) {
            Some(value) => {
                document.insert(field.key().to_string(), value);
            }
            None => match reconciled.resolution(field) {
                Some(Resolution::Unresolved { rejected: Rejection::Invalid }) => {}
                _ => {
                    document.remove(field.key());
                }
            },
        }
    }

    let mut removed_keys: Vec<String> = document
        .keys()
        .filter(|key| !schema.is_allowed_key(key))
        .cloned()
        .collect();
    removed_keys.sort();

    document.retain(|key, _| schema.is_allowed_key(key));

    PrunedRecord {
        id: record.id.clone(),
        document,
        removed_keys,
    }
}
