//! Publish pipeline: project context → local artifact → bucket → sync → listing.
//!
//! Each step is a hard precondition for the next. The first failure returns
//! immediately; nothing has been mutated remotely until the sync step, so no
//! rollback is ever needed.
//!
//! # Navigation
//! - Main entrypoint: [`publish`]
//! - Output: [`PublishReport`], optionally persisted with [`write_report`]

use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

use crate::config::{DestinationUri, PublishConfig};
use crate::contract::{CloudStorage, SyncOptions, SyncSummary};
use crate::error::PublishError;

/// Result of a successful publish, for the caller and downstream deployment.
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub project: String,
    pub region: String,
    pub destination_uri: DestinationUri,
    pub sync: SyncSummary,
    pub objects: Vec<String>,
}

pub async fn publish<S>(config: &PublishConfig, storage: &S) -> Result<PublishReport, PublishError>
where
    S: CloudStorage + ?Sized,
{
    if let Err(reason) = config.validate() {
        error!(reason = %reason, "[PUBLISH][ERROR] Invalid configuration");
        return Err(PublishError::Config(reason));
    }
    let destination = config.destination().map_err(PublishError::Config)?;

    info!(project = %config.project, "[PUBLISH] Setting active project");
    if let Err(e) = storage.set_project_context(&config.project).await {
        error!(error = %e, "[PUBLISH][ERROR] Failed to set project context");
        return Err(PublishError::ExternalCallFailure {
            step: "set project context",
            source: e,
        });
    }

    let artifact = config.artifact_path();
    if !artifact.is_file() {
        error!(path = %artifact.display(), "[PUBLISH][ERROR] Model artifact missing");
        return Err(PublishError::MissingArtifact { path: artifact });
    }
    info!(path = %artifact.display(), "[PUBLISH] Model artifact present");

    let bucket = config.bucket_name();
    let bucket_found = match storage.bucket_exists(bucket).await {
        Ok(found) => found,
        Err(e) => {
            warn!(bucket = %bucket, error = %e, "[PUBLISH] Bucket lookup failed");
            false
        }
    };
    if !bucket_found {
        error!(bucket = %bucket, "[PUBLISH][ERROR] Bucket not found");
        return Err(PublishError::BucketNotFound {
            bucket: bucket.to_string(),
            create_command: config.bucket_create_command(),
        });
    }
    info!(bucket = %bucket, "[PUBLISH] Bucket exists");

    let options = SyncOptions {
        mirror: true,
        parallel: config.parallel,
        dry_run: config.dry_run,
    };
    info!(
        source = %config.local_dir.display(),
        destination = %destination,
        ?options,
        "[PUBLISH] Synchronising artifacts"
    );
    let sync = storage
        .sync_directory(&config.local_dir, &destination, options)
        .await
        .map_err(|e| {
            error!(error = %e, "[PUBLISH][ERROR] Sync failed");
            PublishError::ExternalCallFailure {
                step: "sync",
                source: e,
            }
        })?;

    let objects = storage
        .list_objects(&destination, true)
        .await
        .map_err(|e| {
            error!(error = %e, "[PUBLISH][ERROR] Listing destination failed");
            PublishError::ExternalCallFailure {
                step: "list objects",
                source: e,
            }
        })?;
    info!(
        destination = %destination,
        objects = objects.len(),
        copied = sync.copied,
        removed = sync.removed,
        "[PUBLISH] Publish complete"
    );

    Ok(PublishReport {
        project: config.project.clone(),
        region: config.region.clone(),
        destination_uri: destination,
        sync,
        objects,
    })
}

/// Writes the report as pretty JSON, creating parent directories as needed.
pub fn write_report(report: &PublishReport, path: &Path) -> Result<(), PublishError> {
    let to_report_error = |source: std::io::Error| PublishError::Report {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(to_report_error)?;
    }
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| to_report_error(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    fs::write(path, json + "\n").map_err(to_report_error)?;
    info!(path = %path.display(), "[PUBLISH] Wrote publish report");
    Ok(())
}
