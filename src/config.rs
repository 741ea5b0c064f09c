//! Run configuration. Flags win over environment variables, which win over
//! the defaults the dataset authors shipped with.
use std::path::PathBuf;

use crate::util::env::{env_flag, env_opt};

pub const DEFAULT_DATASET: &str = "firestore_import_data.json";
pub const DEFAULT_CREDENTIALS: &str = "serviceAccountKey.json";

/// Authoring-time keys the reconciliation phase considers for retirement.
/// Inherently dataset-specific, so overridable per run.
pub const DEFAULT_LEGACY_KEYS: &[&str] = &["admin_001", "gestor_001", "contribuinte_001"];

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data_path: PathBuf,
    pub credentials_path: PathBuf,
    /// Defaults to the credentials' own project id when unset.
    pub project_id: Option<String>,
    pub legacy_candidates: Vec<String>,
    pub dry_run: bool,
    pub summary_out: Option<PathBuf>,
    pub http_timeout_secs: u64,
}

impl RunConfig {
    pub fn resolve(
        data: Option<PathBuf>,
        credentials: Option<PathBuf>,
        project_id: Option<String>,
        legacy_keys: Option<Vec<String>>,
        dry_run: bool,
        summary_out: Option<PathBuf>,
    ) -> Self {
        let data_path = data
            .or_else(|| env_opt("DATASET_PATH").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET));
        let credentials_path = credentials
            .or_else(|| env_opt("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS));
        let project_id = project_id.or_else(|| env_opt("FIRESTORE_PROJECT_ID"));
        let legacy_candidates = legacy_keys
            .map(|keys| clean_keys(keys.into_iter()))
            .or_else(|| env_opt("LEGACY_USER_KEYS").map(|raw| parse_legacy_keys(&raw)))
            .unwrap_or_else(|| DEFAULT_LEGACY_KEYS.iter().map(|k| k.to_string()).collect());

        Self {
            data_path,
            credentials_path,
            project_id,
            legacy_candidates,
            dry_run: dry_run || env_flag("FIRESEED_DRY_RUN", false),
            summary_out,
            http_timeout_secs: crate::util::env::env_parse("FIRESEED_HTTP_TIMEOUT_SECS", 30u64),
        }
    }
}

pub fn parse_legacy_keys(raw: &str) -> Vec<String> {
    clean_keys(raw.split(',').map(str::to_string))
}

fn clean_keys(keys: impl Iterator<Item = String>) -> Vec<String> {
    keys.map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}
