//! Reconciliation phase: re-key identity documents from authoring-time
//! legacy keys to the provider-issued UID.
//!
//! Per identity: resolve the email against the identity provider, write the
//! whitelisted migration document under the UID, then retire candidate
//! legacy documents whose stored email proves they are the same identity.
//! The write always lands (or fails the identity) before any delete runs,
//! so no identity can end up with neither document reachable.
use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, warn};

use crate::dataset::{UserRecord, USUARIOS};
use crate::document::{Document, Value};
use crate::normalize::{normalize_temporal_fields, FieldIssue};
use crate::store::{DocumentStore, IdentityProvider, Lookup};

/// Per-identity result.
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationOutcome {
    Migrated { uid: String, retired: Vec<String> },
    NotFound,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct MigratedPair {
    pub email: String,
    pub uid: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureNote {
    pub unit: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileTally {
    pub migrated: usize,
    pub not_found: usize,
    pub failed: usize,
    pub migrated_pairs: Vec<MigratedPair>,
    pub not_found_emails: Vec<String>,
    pub retired_keys: Vec<String>,
    pub failures: Vec<FailureNote>,
}

impl ReconcileTally {
    fn record_migrated(&mut self, email: &str, uid: &str, retired: Vec<String>) {
        self.migrated += 1;
        self.migrated_pairs.push(MigratedPair {
            email: email.to_string(),
            uid: uid.to_string(),
        });
        self.retired_keys.extend(retired);
    }

    fn record_not_found(&mut self, email: &str) {
        self.not_found += 1;
        self.not_found_emails.push(email.to_string());
    }

    fn record_failure(&mut self, unit: &str, reason: &str) {
        self.failed += 1;
        self.failures.push(FailureNote {
            unit: unit.to_string(),
            reason: reason.to_string(),
        });
    }
}

/// Drive the reconciliation over the identity group. Every failure is
/// confined to its identity; the batch always runs to completion.
pub async fn reconcile_users(
    store: &dyn DocumentStore,
    provider: &dyn IdentityProvider,
    users: &IndexMap<String, UserRecord>,
    legacy_candidates: &[String],
    dry_run: bool,
) -> ReconcileTally {
    let mut tally = ReconcileTally::default();
    if users.is_empty() {
        info!("no identity records in the dataset; nothing to reconcile");
        return tally;
    }

    // Key by email. A later record with a duplicate email replaces the
    // earlier one but keeps the first-seen position.
    let mut by_email: IndexMap<&str, &UserRecord> = IndexMap::new();
    for (key, record) in users {
        match record.email.as_deref() {
            Some(email) if !email.trim().is_empty() => {
                by_email.insert(email, record);
            }
            _ => {
                warn!(key = %key, "identity record has no email; cannot resolve it");
                tally.record_failure(key, "record has no email field");
            }
        }
    }

    info!(
        identities = by_email.len(),
        candidates = legacy_candidates.len(),
        "reconciling identities"
    );

    for (email, record) in by_email {
        match migrate_user(store, provider, email, record, legacy_candidates, dry_run).await {
            MigrationOutcome::Migrated { uid, retired } => {
                info!(email = %email, uid = %uid, retired = retired.len(), "identity migrated");
                tally.record_migrated(email, &uid, retired);
            }
            MigrationOutcome::NotFound => {
                warn!(
                    email = %email,
                    "no registered account for this email; create it in the identity provider and re-run"
                );
                tally.record_not_found(email);
            }
            MigrationOutcome::Failed { reason } => {
                warn!(email = %email, error = %reason, "identity migration failed");
                tally.record_failure(email, &reason);
            }
        }
    }

    tally
}

async fn migrate_user(
    store: &dyn DocumentStore,
    provider: &dyn IdentityProvider,
    email: &str,
    record: &UserRecord,
    legacy_candidates: &[String],
    dry_run: bool,
) -> MigrationOutcome {
    let uid = match provider.lookup_by_email(email).await {
        Ok(Lookup::Resolved(uid)) => uid,
        Ok(Lookup::NotFound) => return MigrationOutcome::NotFound,
        Err(e) => {
            return MigrationOutcome::Failed {
                reason: format!("lookup: {e:#}"),
            }
        }
    };

    let (doc, issues) = build_migration_document(record, email);
    for issue in &issues {
        warn!(
            email = %email,
            field = %issue.field,
            reason = %issue.reason,
            "temporal field left unconverted"
        );
    }

    if dry_run {
        info!(email = %email, uid = %uid, "dry-run: would write migration record");
    } else if let Err(e) = store.upsert(USUARIOS.name, &uid, &doc).await {
        // The write failed; leave every legacy document in place.
        return MigrationOutcome::Failed {
            reason: format!("upsert {uid}: {e:#}"),
        };
    }

    let mut retired = Vec::new();
    for key in legacy_candidates {
        // A candidate equal to the canonical key would delete the document
        // just written.
        if key == &uid {
            continue;
        }
        match retire_legacy_key(store, key, email, dry_run).await {
            Ok(true) => retired.push(key.clone()),
            Ok(false) => {}
            Err(e) => {
                return MigrationOutcome::Failed {
                    reason: format!("retiring {key}: {e:#}"),
                }
            }
        }
    }

    MigrationOutcome::Migrated { uid, retired }
}

/// The whitelisted document written under the canonical UID. Only the
/// approved fields are copied; anything else in the source record (the
/// authored password in particular) stays behind.
fn build_migration_document(record: &UserRecord, email: &str) -> (Document, Vec<FieldIssue>) {
    let mut doc = Document::new();
    if let Some(nome) = &record.nome {
        doc.insert("nome".into(), Value::Str(nome.clone()));
    }
    doc.insert("email".into(), Value::Str(email.to_string()));
    if let Some(role) = &record.role {
        doc.insert("role".into(), Value::Str(role.clone()));
    }
    doc.insert("ativo".into(), Value::Bool(record.ativo.unwrap_or(true)));
    doc.insert("localizacao".into(), optional_str(record.localizacao.as_deref()));
    doc.insert("telefone".into(), optional_str(record.telefone.as_deref()));
    for &field in USUARIOS.temporal_fields {
        if let Some(raw) = record.extra.get(field) {
            doc.insert(field.to_string(), Value::from_json(raw));
        }
    }
    let issues = normalize_temporal_fields(&mut doc, USUARIOS.temporal_fields);
    (doc, issues)
}

// Blank contact fields are stored as explicit nulls, not omitted.
fn optional_str(value: Option<&str>) -> Value {
    match value {
        Some(s) if !s.is_empty() => Value::Str(s.to_string()),
        _ => Value::Null,
    }
}

async fn retire_legacy_key(
    store: &dyn DocumentStore,
    key: &str,
    email: &str,
    dry_run: bool,
) -> Result<bool> {
    let Some(existing) = store.get(USUARIOS.name, key).await? else {
        return Ok(false);
    };
    if existing.get("email").and_then(Value::as_str) != Some(email) {
        info!(key = %key, "legacy key holds a different email; left untouched");
        return Ok(false);
    }
    if dry_run {
        info!(key = %key, "dry-run: would delete legacy document");
        return Ok(true);
    }
    store.delete(USUARIOS.name, key).await?;
    info!(key = %key, "legacy document removed");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn user(json: serde_json::Value) -> UserRecord {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn migration_document_copies_the_whitelist_only() {
        let record = user(json!({
            "nome": "Ana",
            "email": "ana@example.com",
            "role": "admin",
            "password": "hunter2",
            "matricula": "X-99",
            "criadoEm": "2024-01-01",
            "atualizadoEm": "2024-02-01T08:00:00Z"
        }));

        let (doc, issues) = build_migration_document(&record, "ana@example.com");

        assert!(issues.is_empty());
        assert!(!doc.contains_key("password"));
        assert!(!doc.contains_key("matricula"));
        assert_eq!(doc.get("nome"), Some(&Value::Str("Ana".into())));
        assert_eq!(doc.get("role"), Some(&Value::Str("admin".into())));
        assert_eq!(
            doc.get("criadoEm").and_then(Value::as_timestamp),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            doc.get("atualizadoEm").and_then(Value::as_timestamp),
            Some(Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn migration_document_applies_the_defaults() {
        let record = user(json!({ "nome": "Bia", "email": "bia@example.com", "role": "gestor" }));
        let (doc, issues) = build_migration_document(&record, "bia@example.com");

        assert!(issues.is_empty());
        assert_eq!(doc.get("ativo"), Some(&Value::Bool(true)));
        assert_eq!(doc.get("localizacao"), Some(&Value::Null));
        assert_eq!(doc.get("telefone"), Some(&Value::Null));
        // Absent temporal fields are not fabricated.
        assert!(!doc.contains_key("criadoEm"));
        assert!(!doc.contains_key("atualizadoEm"));
    }

    #[test]
    fn migration_document_keeps_explicit_inactive_and_blank_contacts() {
        let record = user(json!({
            "email": "carla@example.com",
            "ativo": false,
            "localizacao": "",
            "telefone": "11 99999-0000"
        }));
        let (doc, _) = build_migration_document(&record, "carla@example.com");

        assert_eq!(doc.get("ativo"), Some(&Value::Bool(false)));
        assert_eq!(doc.get("localizacao"), Some(&Value::Null));
        assert_eq!(
            doc.get("telefone"),
            Some(&Value::Str("11 99999-0000".into()))
        );
    }

    #[test]
    fn unparsable_temporal_field_is_reported_but_kept() {
        let record = user(json!({
            "email": "davi@example.com",
            "criadoEm": "ontem"
        }));
        let (doc, issues) = build_migration_document(&record, "davi@example.com");

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "criadoEm");
        assert_eq!(doc.get("criadoEm"), Some(&Value::Str("ontem".into())));
    }
}
