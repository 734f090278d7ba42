// 🔄 Migration Driver - one sequential pass over the whole collection
//
//   Idle → Loading → Reconciling(i) → Persisted(i) → … → FinalSweep → Done
//                                                        ↘ Failed(reason)
//
// Records are handled one at a time in load order. A validation or storage
// failure on one record is recorded and the pass moves on; only a failed
// initial load aborts. The final sweep removes the legacy container from any
// record that still carries it (e.g. records that failed validation).

use crate::db::{BrandStore, PersistOutcome, RawRecord, RecordFilter};
use crate::error::MigrationError;
use crate::prune::prune;
use crate::reconcile::{ReconcilePolicy, Reconciler};
use crate::schema::{BrandSchema, LEGACY_CONTAINER_KEY};
use crate::validate::Validator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationState {
    Idle,
    Loading,
    Reconciling { index: usize },
    Persisted { index: usize },
    FinalSweep,
    Done,
    Failed { reason: String },
}

// ============================================================================
// REPORT
// ============================================================================

/// A record that could not be normalized, with enough detail to re-run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    pub record_id: String,
    pub field: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,

    pub loaded: usize,
    pub processed: usize,
    pub legacy_shapes: usize,
    /// Records that passed validation (in a dry run, nothing is written)
    pub validated: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,

    /// Fields filled from a default on records that were accepted
    pub fields_defaulted: usize,
    pub aliases_adopted: usize,
    pub keys_pruned: usize,

    pub validation_failures: Vec<RecordFailure>,
    pub persistence_failures: Vec<RecordFailure>,

    /// Records the final sweep changed; `None` if it did not run or failed
    pub swept: Option<usize>,
    pub sweep_error: Option<String>,
}

impl MigrationReport {
    fn new(dry_run: bool) -> Self {
        MigrationReport {
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            loaded: 0,
            processed: 0,
            legacy_shapes: 0,
            validated: 0,
            inserted: 0,
            updated: 0,
            unchanged: 0,
            fields_defaulted: 0,
            aliases_adopted: 0,
            keys_pruned: 0,
            validation_failures: Vec::new(),
            persistence_failures: Vec::new(),
            swept: None,
            sweep_error: None,
        }
    }

    pub fn persisted(&self) -> usize {
        self.inserted + self.updated + self.unchanged
    }

    /// Records written or rewritten by this pass
    pub fn changed(&self) -> usize {
        self.inserted + self.updated
    }

    pub fn failed(&self) -> usize {
        self.validation_failures.len() + self.persistence_failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed() == 0 && self.sweep_error.is_none()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} records: {} persisted ({} changed, {} unchanged), {} defaults, {} aliases, \
             {} keys pruned, {} validation failures, {} persistence failures, swept {}",
            self.processed,
            self.persisted(),
            self.changed(),
            self.unchanged,
            self.fields_defaulted,
            self.aliases_adopted,
            self.keys_pruned,
            self.validation_failures.len(),
            self.persistence_failures.len(),
            match (self.swept, &self.sweep_error) {
                (Some(n), _) => n.to_string(),
                (None, Some(_)) => "failed".to_string(),
                (None, None) => "skipped".to_string(),
            }
        )
    }
}

// ============================================================================
// DRIVER
// ============================================================================

pub struct MigrationDriver<'a, S: BrandStore> {
    store: &'a S,
    reconciler: Reconciler,
    validator: Validator,
    dry_run: bool,
    state: MigrationState,
}

impl<'a, S: BrandStore> MigrationDriver<'a, S> {
    pub fn new(store: &'a S, schema: BrandSchema, policy: ReconcilePolicy) -> Self {
        MigrationDriver {
            store,
            reconciler: Reconciler::new(policy),
            validator: Validator::new(schema),
            dry_run: false,
            state: MigrationState::Idle,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn state(&self) -> &MigrationState {
        &self.state
    }

    fn transition(&mut self, next: MigrationState) {
        log::debug!("migration state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    pub fn run(&mut self) -> Result<MigrationReport, MigrationError> {
        let mut report = MigrationReport::new(self.dry_run);

        self.transition(MigrationState::Loading);
        let records = match self.store.load_all() {
            Ok(records) => records,
            Err(e) => {
                log::error!("failed to load brand records: {}", e);
                self.transition(MigrationState::Failed {
                    reason: e.to_string(),
                });
                return Err(MigrationError::Load(e));
            }
        };
        report.loaded = records.len();
        log::info!("loaded {} brand records", records.len());

        for (index, record) in records.iter().enumerate() {
            self.transition(MigrationState::Reconciling { index });
            if self.process_record(record, &mut report) {
                self.transition(MigrationState::Persisted { index });
            }
        }

        if self.dry_run {
            log::info!("dry run: skipping final sweep");
        } else {
            self.transition(MigrationState::FinalSweep);
            match self
                .store
                .bulk_remove_field(LEGACY_CONTAINER_KEY, &RecordFilter::All)
            {
                Ok(count) => {
                    log::info!(
                        "final sweep removed '{}' from {} records",
                        LEGACY_CONTAINER_KEY,
                        count
                    );
                    report.swept = Some(count);
                }
                Err(e) => {
                    log::warn!("final sweep failed: {}", e);
                    report.sweep_error = Some(e.to_string());
                }
            }
        }

        report.finished_at = Some(Utc::now());
        self.transition(MigrationState::Done);
        log::info!("migration finished: {}", report.summary());

        Ok(report)
    }

    /// Reconcile → prune → validate → persist one record.
    /// Returns true when the record was persisted (or accepted, in a dry run).
    fn process_record(&self, record: &RawRecord, report: &mut MigrationReport) -> bool {
        report.processed += 1;

        let reconciled = self.reconciler.reconcile(record);
        if reconciled.legacy_shape {
            report.legacy_shapes += 1;
        }

        let pruned = prune(record, &reconciled, self.validator.schema());

        let brand = match self.validator.validate(&pruned) {
            Ok(brand) => brand,
            Err(e) => {
                log::warn!("{}", e);
                report.validation_failures.push(RecordFailure {
                    record_id: record.id.clone(),
                    field: Some(e.field),
                    reason: e.constraint,
                });
                return false;
            }
        };
        report.validated += 1;

        if self.dry_run {
            report.fields_defaulted += reconciled.defaulted_count();
            report.aliases_adopted += reconciled.alias_count();
            report.keys_pruned += pruned.removed_keys.len();
            return true;
        }

        match self.store.persist(&brand) {
            Ok(outcome) => {
                match outcome {
                    PersistOutcome::Inserted => report.inserted += 1,
                    PersistOutcome::Updated => report.updated += 1,
                    PersistOutcome::Unchanged => report.unchanged += 1,
                }
                report.fields_defaulted += reconciled.defaulted_count();
                report.aliases_adopted += reconciled.alias_count();
                report.keys_pruned += pruned.removed_keys.len();

                if !pruned.removed_keys.is_empty() {
                    log::debug!("record {}: pruned {:?}", record.id, pruned.removed_keys);
                }
                for field in reconciled.defaulted_fields() {
                    log::debug!("record {}: defaulted {}", record.id, field);
                }
                true
            }
            Err(e) => {
                log::warn!("record {}: persist failed: {}", record.id, e);
                report.persistence_failures.push(RecordFailure {
                    record_id: record.id.clone(),
                    field: None,
                    reason: e.to_string(),
                });
                false
            }
        }
    }
}

/// Run one pass with the given bounds and policy
pub fn run_migration<S: BrandStore>(
    store: &S,
    schema: BrandSchema,
    policy: ReconcilePolicy,
    dry_run: bool,
) -> Result<MigrationReport, MigrationError> {
    MigrationDriver::new(store, schema, policy)
        .with_dry_run(dry_run)
        .run()
}
