use crate::error::{StorageError, StorageResult};
use crate::schema::{Brand, CanonicalField};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Untyped brand document as read from storage, before normalization.
///
/// Identity and audit timestamps live beside the document, never inside it,
/// so normalization can only touch content fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub document: Map<String, Value>,
}

impl RawRecord {
    /// Build an unsaved record with a fresh identity
    pub fn new(document: Map<String, Value>) -> Self {
        let now = Utc::now();
        RawRecord {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            document,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.document.keys().map(|k| k.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistOutcome {
    Inserted,
    Updated,
    /// Stored content already matched; nothing written, `updated_at` untouched
    Unchanged,
}

/// Which records a bulk operation applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFilter {
    All,
    Ids(Vec<String>),
}

// ============================================================================
// STORAGE COLLABORATOR
// ============================================================================

/// What the migration needs from storage.
///
/// `persist` is the strict path: it only accepts a validated [`Brand`].
/// `bulk_remove_field` is the administrative path that may delete keys the
/// schema never declared.
pub trait BrandStore {
    fn load_all(&self) -> StorageResult<Vec<RawRecord>>;

    fn persist(&self, brand: &Brand) -> StorageResult<PersistOutcome>;

    /// Remove `field_path` (dot separated, e.g. `brand` or `brand.name`) from
    /// every matching record that still has it. Returns the number of records changed.
    fn bulk_remove_field(&self, field_path: &str, filter: &RecordFilter) -> StorageResult<usize>;
}

/// Event for audit trail
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

const ACTOR: &str = "brand_normalizer";

pub fn setup_database(conn: &Connection) -> StorageResult<()> {
    // WAL for crash recovery; in-memory databases silently stay on "memory"
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Brands (one JSON document per row)
    // content_hash is NULL until the row has been written through `persist`
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS brands (
            id TEXT PRIMARY KEY,
            document TEXT NOT NULL,
            content_hash TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            seq INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute("CREATE INDEX IF NOT EXISTS idx_brands_seq ON brands(seq)", [])?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> StorageResult<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity, oldest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> StorageResult<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY id ASC",
    )?;

    let rows = stmt
        .query_map(params![entity_type, entity_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(event_id, timestamp, event_type, entity_type, entity_id, data, actor)| {
            Ok(Event {
                timestamp: parse_timestamp(&event_id, &timestamp)?,
                data: serde_json::from_str(&data)?,
                event_id,
                event_type,
                entity_type,
                entity_id,
                actor,
            })
        })
        .collect::<StorageResult<Vec<Event>>>()
}

// ============================================================================
// SQLITE STORE
// ============================================================================

pub struct SqliteBrandStore {
    conn: Connection,
}

impl SqliteBrandStore {
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        setup_database(&conn)?;
        Ok(SqliteBrandStore { conn })
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(SqliteBrandStore { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Insert a document exactly as given, bypassing the schema.
    /// Used to populate a collection (seeding, fixtures).
    pub fn insert_raw(&self, document: &Map<String, Value>) -> StorageResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.insert_raw_with_id(&id, document)?;
        Ok(id)
    }

    pub fn insert_raw_with_id(&self, id: &str, document: &Map<String, Value>) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let document_json = serde_json::to_string(document)?;

        self.conn.execute(
            "INSERT INTO brands (id, document, content_hash, created_at, updated_at, seq)
             VALUES (?1, ?2, NULL, ?3, ?3, (SELECT COALESCE(MAX(seq), 0) + 1 FROM brands))",
            params![id, document_json, now],
        )?;

        Ok(())
    }

    pub fn get_raw(&self, id: &str) -> StorageResult<RawRecord> {
        let row = self
            .conn
            .query_row(
                "SELECT id, document, created_at, updated_at FROM brands WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((id, document, created_at, updated_at)) => {
                raw_record_from_row(id, &document, &created_at, &updated_at)
            }
            None => Err(StorageError::NotFound(id.to_string())),
        }
    }

    pub fn count(&self) -> StorageResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM brands", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Number of records whose document still has `field_path`
    pub fn count_with_field(&self, field_path: &str) -> StorageResult<i64> {
        let json_path = to_json_path(field_path)?;
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM brands WHERE json_type(document, ?1) IS NOT NULL",
            params![json_path],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Number of records carrying at least one key outside the canonical field set
    pub fn count_non_canonical(&self) -> StorageResult<i64> {
        let keys: Vec<&str> = CanonicalField::ALL.iter().map(|f| f.key()).collect();
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT b.id)
             FROM brands b, json_each(b.document) j
             WHERE j.key NOT IN (?1, ?2, ?3, ?4)",
            params![keys[0], keys[1], keys[2], keys[3]],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn remove_field_where(
        &self,
        json_path: &str,
        id: Option<&str>,
        now: &str,
    ) -> StorageResult<usize> {
        let changed = match id {
            None => self.conn.execute(
                "UPDATE brands
                 SET document = json_remove(document, ?1), updated_at = ?2
                 WHERE json_type(document, ?1) IS NOT NULL",
                params![json_path, now],
            )?,
            Some(id) => self.conn.execute(
                "UPDATE brands
                 SET document = json_remove(document, ?1), updated_at = ?2
                 WHERE json_type(document, ?1) IS NOT NULL AND id = ?3",
                params![json_path, now, id],
            )?,
        };
        Ok(changed)
    }
}

impl BrandStore for SqliteBrandStore {
    fn load_all(&self) -> StorageResult<Vec<RawRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, document, created_at, updated_at
             FROM brands
             ORDER BY seq ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, document, created_at, updated_at)| {
                raw_record_from_row(id, &document, &created_at, &updated_at)
            })
            .collect()
    }

    fn persist(&self, brand: &Brand) -> StorageResult<PersistOutcome> {
        let document = serde_json::to_value(brand)?;
        let document_json = serde_json::to_string(&document)?;
        let hash = brand.content_hash();
        let now = Utc::now().to_rfc3339();

        let tx = self.conn.unchecked_transaction()?;

        let existing: Option<(String, Option<String>)> = tx
            .query_row(
                "SELECT document, content_hash FROM brands WHERE id = ?1",
                params![brand.id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let outcome = match existing {
            Some((stored_json, stored_hash)) => {
                let stored: Value = serde_json::from_str(&stored_json)?;
                if stored_hash.as_deref() == Some(hash.as_str()) && stored == document {
                    PersistOutcome::Unchanged
                } else {
                    tx.execute(
                        "UPDATE brands SET document = ?1, content_hash = ?2, updated_at = ?3
                         WHERE id = ?4",
                        params![document_json, hash, now, brand.id],
                    )?;
                    PersistOutcome::Updated
                }
            }
            None => {
                tx.execute(
                    "INSERT INTO brands (id, document, content_hash, created_at, updated_at, seq)
                     VALUES (?1, ?2, ?3, ?4, ?4, (SELECT COALESCE(MAX(seq), 0) + 1 FROM brands))",
                    params![brand.id, document_json, hash, now],
                )?;
                PersistOutcome::Inserted
            }
        };

        let event_type = match outcome {
            PersistOutcome::Inserted => Some("brand_inserted"),
            PersistOutcome::Updated => Some("brand_updated"),
            PersistOutcome::Unchanged => None,
        };
        if let Some(event_type) = event_type {
            let event = Event::new(
                event_type,
                "brand",
                &brand.id,
                serde_json::json!({ "content_hash": hash }),
                ACTOR,
            );
            insert_event(&tx, &event)?;
        }

        tx.commit()?;
        Ok(outcome)
    }

    fn bulk_remove_field(&self, field_path: &str, filter: &RecordFilter) -> StorageResult<usize> {
        let json_path = to_json_path(field_path)?;
        let now = Utc::now().to_rfc3339();

        let tx = self.conn.unchecked_transaction()?;
        let removed = match filter {
            RecordFilter::All => self.remove_field_where(&json_path, None, &now)?,
            RecordFilter::Ids(ids) => {
                let mut total = 0;
                for id in ids {
                    total += self.remove_field_where(&json_path, Some(id), &now)?;
                }
                total
            }
        };

        if removed > 0 {
            let event = Event::new(
                "legacy_field_swept",
                "collection",
                "brands",
                serde_json::json!({ "field": field_path, "removed": removed }),
                ACTOR,
            );
            insert_event(&tx, &event)?;
        }

        tx.commit()?;
        Ok(removed)
    }
}

fn raw_record_from_row(
    id: String,
    document: &str,
    created_at: &str,
    updated_at: &str,
) -> StorageResult<RawRecord> {
    let value: Value = serde_json::from_str(document)?;
    let document = match value {
        Value::Object(map) => map,
        other => {
            return Err(StorageError::Corrupt {
                id,
                reason: format!("document is not an object: {}", other),
            })
        }
    };

    Ok(RawRecord {
        created_at: parse_timestamp(&id, created_at)?,
        updated_at: parse_timestamp(&id, updated_at)?,
        id,
        document,
    })
}

fn parse_timestamp(id: &str, raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt {
            id: id.to_string(),
            reason: format!("bad timestamp '{}': {}", raw, e),
        })
}

/// `brand.name` → `$.brand.name`. Only plain identifier segments are accepted.
fn to_json_path(field_path: &str) -> StorageResult<String> {
    let valid = !field_path.is_empty()
        && field_path.split('.').all(|segment| {
            !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

    if valid {
        Ok(format!("$.{}", field_path))
    } else {
        Err(StorageError::InvalidFieldPath(field_path.to_string()))
    }
}
