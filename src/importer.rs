//! Import phase: every group present in the dataset is written into its
//! collection, one record at a time, in file order. A record that fails to
//! write is tallied and skipped; the group keeps going.
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, warn};

use crate::dataset::{Dataset, GroupRecord, GroupSpec};
use crate::normalize::{normalize_temporal_fields, FieldIssue};
use crate::store::DocumentStore;

/// Per-record import result.
#[derive(Debug)]
pub enum ImportOutcome {
    Written { issues: Vec<FieldIssue> },
    Failed { reason: String },
}

/// Per-group counters for the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct GroupTally {
    pub group: String,
    pub written: usize,
    pub failed: usize,
    pub field_issues: usize,
}

impl GroupTally {
    fn new(group: &str) -> Self {
        Self {
            group: group.to_string(),
            written: 0,
            failed: 0,
            field_issues: 0,
        }
    }

    fn record(&mut self, outcome: &ImportOutcome) {
        match outcome {
            ImportOutcome::Written { issues } => {
                self.written += 1;
                self.field_issues += issues.len();
            }
            ImportOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Import the groups present in the dataset, in the fixed group order the
/// dataset authors rely on. Empty groups produce no tally.
pub async fn import_dataset(
    store: &dyn DocumentStore,
    dataset: &Dataset,
    dry_run: bool,
) -> Vec<GroupTally> {
    let mut tallies = Vec::new();
    if !dataset.materiais.is_empty() {
        tallies.push(import_group(store, &dataset.materiais, dry_run).await);
    }
    if !dataset.instrumentos.is_empty() {
        tallies.push(import_group(store, &dataset.instrumentos, dry_run).await);
    }
    if !dataset.alertas.is_empty() {
        tallies.push(import_group(store, &dataset.alertas, dry_run).await);
    }
    if !dataset.usuarios.is_empty() {
        tallies.push(import_group(store, &dataset.usuarios, dry_run).await);
    }
    tallies
}

pub async fn import_group<R: GroupRecord>(
    store: &dyn DocumentStore,
    records: &IndexMap<String, R>,
    dry_run: bool,
) -> GroupTally {
    let spec = R::spec();
    let mut tally = GroupTally::new(spec.name);
    info!(group = spec.name, records = records.len(), "importing group");

    for (key, record) in records {
        let outcome = import_record(store, spec, key, record, dry_run).await;
        if let ImportOutcome::Failed { reason } = &outcome {
            warn!(group = spec.name, key = %key, error = %reason, "record import failed");
        }
        tally.record(&outcome);
    }

    info!(
        group = spec.name,
        written = tally.written,
        failed = tally.failed,
        field_issues = tally.field_issues,
        "group finished"
    );
    tally
}

async fn import_record<R: GroupRecord>(
    store: &dyn DocumentStore,
    spec: &GroupSpec,
    key: &str,
    record: &R,
    dry_run: bool,
) -> ImportOutcome {
    let mut doc = match record.to_document() {
        Ok(doc) => doc,
        Err(e) => {
            return ImportOutcome::Failed {
                reason: format!("{e:#}"),
            }
        }
    };

    let issues = normalize_temporal_fields(&mut doc, spec.temporal_fields);
    for issue in &issues {
        warn!(
            group = spec.name,
            key = %key,
            field = %issue.field,
            reason = %issue.reason,
            "temporal field left unconverted"
        );
    }

    let label = record.label().unwrap_or(key);
    if dry_run {
        info!(group = spec.name, key = %key, label = %label, "dry-run: would upsert");
        return ImportOutcome::Written { issues };
    }

    match store.upsert(spec.name, key, &doc).await {
        Ok(()) => {
            info!(group = spec.name, key = %key, label = %label, "upserted");
            ImportOutcome::Written { issues }
        }
        Err(e) => ImportOutcome::Failed {
            reason: format!("{e:#}"),
        },
    }
}
