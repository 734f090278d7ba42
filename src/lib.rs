// Brand Normalizer - Core Library
// Reconciles drifted brand documents into the canonical schema, idempotently

pub mod error;
pub mod schema;     // Canonical Brand schema
pub mod coerce;     // Best-effort value coercion
pub mod shape;      // Canonical vs legacy record shapes
pub mod db;         // Storage collaborator (SQLite)
pub mod reconcile;  // Field Reconciler
pub mod prune;      // Field Pruner
pub mod validate;   // Validator
pub mod migrate;    // Migration Driver
pub mod config;
pub mod seed;       // Dev/test data generator

// Re-export commonly used types
pub use error::{ConfigError, MigrationError, StorageError, ValidationError};
pub use schema::{Brand, BrandSchema, CanonicalField, LEGACY_CONTAINER_KEY};
pub use coerce::is_missing;
pub use shape::{LegacyAlias, RecordShape};
pub use db::{
    BrandStore, PersistOutcome, RawRecord, RecordFilter, SqliteBrandStore,
    Event, setup_database, insert_event, get_events_for_entity,
};
pub use reconcile::{Reconciled, ReconcilePolicy, Reconciler, Resolution, Rejection};
pub use prune::{prune, PrunedRecord};
pub use validate::Validator;
pub use migrate::{
    MigrationDriver, MigrationReport, MigrationState, RecordFailure, run_migration,
};
pub use config::MigrationConfig;
pub use seed::{seed_store, SeedOptions, Seeder};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
