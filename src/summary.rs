//! Run summary: the aggregate the orchestrator reports after a run, both as
//! a human-readable block and as JSON for programmatic consumers.
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::importer::GroupTally;
use crate::reconcile::ReconcileTally;

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub dry_run: bool,
    pub import: Vec<GroupTally>,
    pub reconcile: Option<ReconcileTally>,
}

impl RunSummary {
    pub fn new(dry_run: bool, import: Vec<GroupTally>, reconcile: Option<ReconcileTally>) -> Self {
        Self {
            generated_at: Utc::now(),
            dry_run,
            import,
            reconcile,
        }
    }

    /// Failures across both phases. The exit code does not depend on this;
    /// it exists for narration and for programmatic consumers.
    pub fn total_failures(&self) -> usize {
        let import_failures: usize = self.import.iter().map(|t| t.failed).sum();
        import_failures + self.reconcile.as_ref().map_or(0, |t| t.failed)
    }

    pub fn print(&self) {
        if self.dry_run {
            println!("[fireseed] dry run: nothing was written or deleted");
        }
        for tally in &self.import {
            println!(
                "[fireseed] import {}: written={} failed={} field_issues={}",
                tally.group, tally.written, tally.failed, tally.field_issues
            );
        }
        if let Some(tally) = &self.reconcile {
            println!(
                "[fireseed] reconcile: migrated={} not_found={} failed={}",
                tally.migrated, tally.not_found, tally.failed
            );
            for pair in &tally.migrated_pairs {
                println!("[fireseed]   {} -> {}", pair.email, pair.uid);
            }
            for email in &tally.not_found_emails {
                println!(
                    "[fireseed]   not found: {email} (create the account in the identity provider and re-run)"
                );
            }
            if !tally.retired_keys.is_empty() {
                println!(
                    "[fireseed]   retired legacy keys: {}",
                    tally.retired_keys.join(", ")
                );
            }
            for failure in &tally.failures {
                println!("[fireseed]   failed {}: {}", failure.unit, failure.reason);
            }
        }
        println!(
            "[fireseed] done: total_failures={} ts={}",
            self.total_failures(),
            self.generated_at.to_rfc3339()
        );
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing summary {}", path.display()))?;
        info!(path = %path.display(), "run summary written");
        Ok(())
    }
}
