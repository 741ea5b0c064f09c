//! Batch orchestrator: pre-flight, client construction, and phase
//! sequencing. Failures before the first write abort the run; after that,
//! every failure is per-unit and lands in the summary.
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::RunConfig;
use crate::dataset::{load_dataset, Dataset};
use crate::importer::import_dataset;
use crate::reconcile::reconcile_users;
use crate::remote::firestore::FirestoreClient;
use crate::remote::gauth::{ServiceAccountKey, TokenProvider, FIRESTORE_SCOPE, IDENTITY_SCOPE};
use crate::remote::identity::FirebaseAuthClient;
use crate::store::{DocumentStore, IdentityProvider};
use crate::summary::RunSummary;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Import,
    Reconcile,
    All,
}

impl Phase {
    fn imports(self) -> bool {
        matches!(self, Phase::Import | Phase::All)
    }
    fn reconciles(self) -> bool {
        matches!(self, Phase::Reconcile | Phase::All)
    }
}

fn load_inputs(config: &RunConfig) -> Result<(ServiceAccountKey, Dataset)> {
    let key = ServiceAccountKey::from_path(&config.credentials_path)?;
    let dataset = load_dataset(&config.data_path)?;
    Ok((key, dataset))
}

pub async fn run(config: &RunConfig, phase: Phase) -> Result<RunSummary> {
    let (key, dataset) = load_inputs(config)?;
    let project_id = config
        .project_id
        .clone()
        .unwrap_or_else(|| key.project_id.clone());
    info!(
        project = %project_id,
        account = %key.client_email,
        records = dataset.total_records(),
        dry_run = config.dry_run,
        "starting run"
    );

    let tokens = Arc::new(TokenProvider::new(key, &[FIRESTORE_SCOPE, IDENTITY_SCOPE])?);
    // Refused credentials must fail the run before anything is written.
    tokens.bearer().await.context("credential pre-flight")?;

    let store = FirestoreClient::new(
        &project_id,
        Arc::clone(&tokens),
        None,
        Some(config.http_timeout_secs),
    )?;
    let provider = FirebaseAuthClient::new(tokens, None, Some(config.http_timeout_secs))?;

    Ok(run_phases(
        &store,
        &provider,
        &dataset,
        &config.legacy_candidates,
        config.dry_run,
        phase,
    )
    .await)
}

/// Phase sequencing over injected collaborators.
pub async fn run_phases(
    store: &dyn DocumentStore,
    provider: &dyn IdentityProvider,
    dataset: &Dataset,
    legacy_candidates: &[String],
    dry_run: bool,
    phase: Phase,
) -> RunSummary {
    let import = if phase.imports() {
        import_dataset(store, dataset, dry_run).await
    } else {
        Vec::new()
    };
    let reconcile = if phase.reconciles() {
        Some(
            reconcile_users(
                store,
                provider,
                &dataset.usuarios,
                legacy_candidates,
                dry_run,
            )
            .await,
        )
    } else {
        None
    };
    RunSummary::new(dry_run, import, reconcile)
}

/// Validate credentials and dataset without touching any remote service.
pub fn preflight(config: &RunConfig) -> Result<()> {
    let (key, dataset) = load_inputs(config)?;
    let project_id = config
        .project_id
        .clone()
        .unwrap_or_else(|| key.project_id.clone());
    info!(
        project = %project_id,
        account = %key.client_email,
        materiais = dataset.materiais.len(),
        instrumentos = dataset.instrumentos.len(),
        alertas = dataset.alertas.len(),
        usuarios = dataset.usuarios.len(),
        candidates = ?config.legacy_candidates,
        "preflight ok"
    );
    Ok(())
}
