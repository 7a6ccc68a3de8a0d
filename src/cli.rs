//! Command line surface for model-publish.
//!
//! [`Cli`] defines the user-facing flags; [`run`] is the async entrypoint used
//! by `main` and by integration tests. Business logic lives in
//! [`crate::publish`].

use crate::contract::CloudStorage;
use crate::error::PublishError;
use crate::gcloud::GcloudCli;
use crate::load_config::{load_config, ConfigOverrides};
use crate::publish::{publish, write_report, PublishReport};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// CLI for model-publish: push trained model artifacts to Cloud Storage.
#[derive(Parser, Debug)]
#[clap(
    name = "model-publish",
    version,
    about = "Validate a trained model artifact and mirror it to gs://<bucket>/<model>/ for deployment"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check preconditions and sync the local artifact directory to the bucket
    Publish(PublishArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub struct PublishArgs {
    /// Path to an optional YAML config file
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Cloud project to make active
    #[clap(long, env = "MODEL_PUBLISH_PROJECT")]
    pub project: Option<String>,

    /// Region used when suggesting a bucket creation command
    #[clap(long, env = "MODEL_PUBLISH_REGION")]
    pub region: Option<String>,

    /// Destination bucket (with or without gs://)
    #[clap(long, env = "MODEL_PUBLISH_BUCKET")]
    pub bucket: Option<String>,

    /// Folder under the bucket the artifacts are published to
    #[clap(long, env = "MODEL_PUBLISH_MODEL_NAME")]
    pub model_name: Option<String>,

    /// Local directory holding the trained artifacts
    #[clap(long, env = "MODEL_PUBLISH_LOCAL_DIR")]
    pub local_dir: Option<PathBuf>,

    /// Artifact file that must exist inside the local directory
    #[clap(long)]
    pub artifact_file: Option<String>,

    /// Disable parallel (gsutil -m) transfer
    #[clap(long)]
    pub no_parallel: bool,

    /// Report what the sync would change without changing anything
    #[clap(long)]
    pub dry_run: bool,

    /// gcloud executable to invoke
    #[clap(long)]
    pub gcloud_bin: Option<PathBuf>,

    /// gsutil executable to invoke
    #[clap(long)]
    pub gsutil_bin: Option<PathBuf>,

    /// Write a JSON publish report to this path
    #[clap(long = "report")]
    pub report_path: Option<PathBuf>,
}

impl From<PublishArgs> for ConfigOverrides {
    fn from(args: PublishArgs) -> Self {
        ConfigOverrides {
            project: args.project,
            region: args.region,
            bucket: args.bucket,
            model_name: args.model_name,
            local_dir: args.local_dir,
            artifact_file: args.artifact_file,
            parallel: args.no_parallel.then_some(false),
            dry_run: args.dry_run.then_some(true),
            gcloud_bin: args.gcloud_bin,
            gsutil_bin: args.gsutil_bin,
            report_path: args.report_path,
        }
    }
}

/// Async CLI entrypoint for integration tests and main().
pub async fn run(cli: Cli) -> Result<PublishReport, PublishError> {
    tracing::info!("[CLI] model-publish starting");

    match cli.command {
        Commands::Publish(args) => {
            let config_path = args.config.clone();
            let config = load_config(config_path.as_deref(), args.into())
                .map_err(|e| PublishError::Config(format!("{e:#}")))?;
            let storage = GcloudCli::from_config(&config);
            run_publish(&config, &storage).await
        }
    }
}

/// Runs the pipeline against `storage` and prints the user-facing summary.
pub async fn run_publish<S>(
    config: &crate::config::PublishConfig,
    storage: &S,
) -> Result<PublishReport, PublishError>
where
    S: CloudStorage + ?Sized,
{
    println!("Publish starting...");
    let report = publish(config, storage).await?;

    for object in &report.objects {
        println!("{object}");
    }
    let verb = if report.sync.dry_run { "would change" } else { "changed" };
    println!(
        "Published model artifacts to {} ({} copied, {} removed; {verb})",
        report.destination_uri, report.sync.copied, report.sync.removed
    );

    if let Some(path) = &config.report_path {
        write_report(&report, path)?;
        println!("Report written to {}", path.display());
    }

    tracing::info!(command = "publish", destination = %report.destination_uri, "Publish complete");
    Ok(report)
}
