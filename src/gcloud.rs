//! [`CloudStorage`] backed by the `gcloud` and `gsutil` command line tools.
//!
//! Each operation is one child process, awaited to completion. Authentication
//! is whatever the installed tooling is already configured with.

use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::{DestinationUri, PublishConfig};
use crate::contract::{CloudStorage, SyncOptions, SyncSummary};
use crate::error::StorageError;

pub struct GcloudCli {
    gcloud_bin: PathBuf,
    gsutil_bin: PathBuf,
}

impl GcloudCli {
    pub fn new(gcloud_bin: impl Into<PathBuf>, gsutil_bin: impl Into<PathBuf>) -> Self {
        Self {
            gcloud_bin: gcloud_bin.into(),
            gsutil_bin: gsutil_bin.into(),
        }
    }

    pub fn from_config(config: &PublishConfig) -> Self {
        Self::new(config.gcloud_bin.clone(), config.gsutil_bin.clone())
    }

    async fn exec(&self, program: &Path, args: &[OsString]) -> Result<Output, StorageError> {
        let command_line = render_command(program, args);
        debug!(command = %command_line, "[GCLOUD] Running command");

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|source| {
                error!(program = %program.display(), error = ?source, "[GCLOUD][ERROR] Failed to launch");
                StorageError::Spawn {
                    program: program.display().to_string(),
                    source,
                }
            })?;

        debug!(
            command = %command_line,
            status = ?output.status.code(),
            "[GCLOUD] Command finished"
        );
        Ok(output)
    }

    /// Runs the command and turns a non-zero exit into [`StorageError::Failed`].
    async fn exec_checked(&self, program: &Path, args: &[OsString]) -> Result<Output, StorageError> {
        let output = self.exec(program, args).await?;
        if output.status.success() {
            return Ok(output);
        }
        Err(command_failure(program, args, &output))
    }
}

fn command_failure(program: &Path, args: &[OsString], output: &Output) -> StorageError {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    error!(
        command = %render_command(program, args),
        status = ?output.status.code(),
        stderr = %stderr,
        "[GCLOUD][ERROR] Command exited unsuccessfully"
    );
    StorageError::Failed {
        command: render_command(program, args),
        code: output.status.code(),
        stderr,
    }
}

#[async_trait]
impl CloudStorage for GcloudCli {
    async fn set_project_context(&self, project_id: &str) -> Result<(), StorageError> {
        let args = set_project_args(project_id);
        self.exec_checked(&self.gcloud_bin, &args).await?;
        info!(project = %project_id, "[GCLOUD] Active project set");
        Ok(())
    }

    async fn bucket_exists(&self, bucket_name: &str) -> Result<bool, StorageError> {
        let args = bucket_exists_args(bucket_name);
        let output = self.exec(&self.gsutil_bin, &args).await?;
        let exists = output.status.success();
        if !exists {
            debug!(
                bucket = %bucket_name,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "[GCLOUD] Bucket lookup returned non-zero"
            );
        }
        Ok(exists)
    }

    async fn sync_directory(
        &self,
        local_path: &Path,
        destination: &DestinationUri,
        options: SyncOptions,
    ) -> Result<SyncSummary, StorageError> {
        let args = rsync_args(local_path, destination, options);
        let output = self.exec_checked(&self.gsutil_bin, &args).await?;

        // gsutil reports per-object progress on stderr.
        let mut progress = String::from_utf8_lossy(&output.stderr).into_owned();
        progress.push('\n');
        progress.push_str(&String::from_utf8_lossy(&output.stdout));
        for line in progress.lines().map(str::trim).filter(|l| !l.is_empty()) {
            info!(line = %line, "[GCLOUD] rsync");
        }

        let summary = parse_sync_summary(&progress, options.dry_run);
        info!(
            destination = %destination,
            copied = summary.copied,
            removed = summary.removed,
            dry_run = summary.dry_run,
            "[GCLOUD] Sync finished"
        );
        Ok(summary)
    }

    async fn list_objects(
        &self,
        destination: &DestinationUri,
        recursive: bool,
    ) -> Result<Vec<String>, StorageError> {
        let args = list_args(destination, recursive);
        let output = self.exec(&self.gsutil_bin, &args).await?;
        if output.status.success() {
            return Ok(parse_listing(&String::from_utf8_lossy(&output.stdout)));
        }
        // A prefix nothing has been written to yet (e.g. after a dry run).
        if matched_no_objects(&String::from_utf8_lossy(&output.stderr)) {
            info!(destination = %destination, "[GCLOUD] Destination holds no objects");
            return Ok(Vec::new());
        }
        Err(command_failure(&self.gsutil_bin, &args, &output))
    }
}

fn os_args<I, S>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    args.into_iter().map(|a| a.as_ref().to_os_string()).collect()
}

pub fn set_project_args(project_id: &str) -> Vec<OsString> {
    os_args(["config", "set", "project", project_id])
}

pub fn bucket_exists_args(bucket_name: &str) -> Vec<OsString> {
    os_args(["ls".to_string(), "-b".to_string(), format!("gs://{bucket_name}")])
}

/// `gsutil [-m] rsync -r [-d] [-n] <local> <destination>`
pub fn rsync_args(local_path: &Path, destination: &DestinationUri, options: SyncOptions) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    if options.parallel {
        args.push("-m".into());
    }
    args.push("rsync".into());
    args.push("-r".into());
    if options.mirror {
        args.push("-d".into());
    }
    if options.dry_run {
        args.push("-n".into());
    }
    args.push(local_path.as_os_str().to_os_string());
    args.push(destination.as_str().into());
    args
}

pub fn list_args(destination: &DestinationUri, recursive: bool) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["ls".into()];
    if recursive {
        args.push("-r".into());
    }
    args.push(destination.as_str().into());
    args
}

/// Counts transfer and deletion lines in gsutil rsync output.
pub fn parse_sync_summary(output: &str, dry_run: bool) -> SyncSummary {
    let mut summary = SyncSummary {
        dry_run,
        ..SyncSummary::default()
    };
    for line in output.lines().map(str::trim) {
        if line.starts_with("Copying ") || line.starts_with("Would copy ") {
            summary.copied += 1;
        } else if line.starts_with("Removing ") || line.starts_with("Would remove ") {
            summary.removed += 1;
        }
    }
    summary
}

/// Object URIs from `gsutil ls` output, skipping blank lines and `prefix/:` headers.
pub fn parse_listing(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.ends_with(':'))
        .map(str::to_string)
        .collect()
}

/// gsutil's `ls` reports an empty prefix as a failure with this message.
pub fn matched_no_objects(stderr: &str) -> bool {
    stderr.contains("matched no objects")
}

fn render_command(program: &Path, args: &[OsString]) -> String {
    let mut rendered = program.display().to_string();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&arg.to_string_lossy());
    }
    rendered
}
