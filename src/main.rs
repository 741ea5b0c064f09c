use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fireseed::config::RunConfig;
use fireseed::pipeline::{self, Phase};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "fireseed",
    version,
    about = "One-shot Firestore dataset import and identity reconciliation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Import every dataset group into its Firestore collection
    Import {
        /// Path to the dataset JSON file
        #[arg(long)]
        data: Option<PathBuf>,
        /// Path to the service-account credentials JSON
        #[arg(long)]
        credentials: Option<PathBuf>,
        /// Project id (defaults to the credentials' project_id)
        #[arg(long)]
        project_id: Option<String>,
        /// Only log actions without mutating the store
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        /// Write the run summary as JSON to this path
        #[arg(long)]
        summary_out: Option<PathBuf>,
    },
    /// Re-key user documents to auth UIDs and retire legacy keys
    Reconcile {
        /// Path to the dataset JSON file
        #[arg(long)]
        data: Option<PathBuf>,
        /// Path to the service-account credentials JSON
        #[arg(long)]
        credentials: Option<PathBuf>,
        /// Project id (defaults to the credentials' project_id)
        #[arg(long)]
        project_id: Option<String>,
        /// Legacy document keys considered for retirement (comma separated)
        #[arg(long, value_delimiter = ',')]
        legacy_keys: Option<Vec<String>>,
        /// Only log writes and deletes; lookups and reads still run
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        /// Write the run summary as JSON to this path
        #[arg(long)]
        summary_out: Option<PathBuf>,
    },
    /// Import, then reconcile (the full pipeline)
    Run {
        /// Path to the dataset JSON file
        #[arg(long)]
        data: Option<PathBuf>,
        /// Path to the service-account credentials JSON
        #[arg(long)]
        credentials: Option<PathBuf>,
        /// Project id (defaults to the credentials' project_id)
        #[arg(long)]
        project_id: Option<String>,
        /// Legacy document keys considered for retirement (comma separated)
        #[arg(long, value_delimiter = ',')]
        legacy_keys: Option<Vec<String>>,
        /// Only log writes and deletes; lookups and reads still run
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        /// Write the run summary as JSON to this path
        #[arg(long)]
        summary_out: Option<PathBuf>,
    },
    /// Parse credentials and dataset locally without touching remote services
    Preflight {
        /// Path to the dataset JSON file
        #[arg(long)]
        data: Option<PathBuf>,
        /// Path to the service-account credentials JSON
        #[arg(long)]
        credentials: Option<PathBuf>,
        /// Project id (defaults to the credentials' project_id)
        #[arg(long)]
        project_id: Option<String>,
        /// Legacy document keys considered for retirement (comma separated)
        #[arg(long, value_delimiter = ',')]
        legacy_keys: Option<Vec<String>>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    fireseed::util::env::init_env();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .try_init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Import {
            data,
            credentials,
            project_id,
            dry_run,
            summary_out,
        } => {
            let config =
                RunConfig::resolve(data, credentials, project_id, None, dry_run, summary_out);
            execute(&config, Phase::Import).await?;
        }
        Commands::Reconcile {
            data,
            credentials,
            project_id,
            legacy_keys,
            dry_run,
            summary_out,
        } => {
            let config = RunConfig::resolve(
                data,
                credentials,
                project_id,
                legacy_keys,
                dry_run,
                summary_out,
            );
            execute(&config, Phase::Reconcile).await?;
        }
        Commands::Run {
            data,
            credentials,
            project_id,
            legacy_keys,
            dry_run,
            summary_out,
        } => {
            let config = RunConfig::resolve(
                data,
                credentials,
                project_id,
                legacy_keys,
                dry_run,
                summary_out,
            );
            execute(&config, Phase::All).await?;
        }
        Commands::Preflight {
            data,
            credentials,
            project_id,
            legacy_keys,
        } => {
            let config =
                RunConfig::resolve(data, credentials, project_id, legacy_keys, false, None);
            log_env_snapshot()?;
            pipeline::preflight(&config)?;
            println!("[fireseed] preflight ok");
        }
    }
    Ok(())
}

async fn execute(config: &RunConfig, phase: Phase) -> Result<()> {
    log_env_snapshot()?;
    let summary = pipeline::run(config, phase).await?;
    summary.print();
    if let Some(path) = &config.summary_out {
        summary.write_json(path)?;
    }
    Ok(())
}

fn log_env_snapshot() -> Result<()> {
    fireseed::util::env::preflight_check(
        "fireseed",
        &[],
        &[
            "DATASET_PATH",
            "GOOGLE_APPLICATION_CREDENTIALS",
            "FIRESTORE_PROJECT_ID",
            "LEGACY_USER_KEYS",
            "FIRESEED_DRY_RUN",
            "FIRESEED_HTTP_TIMEOUT_SECS",
            "RUST_LOG",
        ],
    )
}
