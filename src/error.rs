//! Error taxonomy for a publish run.
//!
//! Every variant is terminal: nothing here is retried. [`PublishError::exit_code`]
//! maps each failure onto the process exit status the binary reports.

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a delegated `gcloud`/`gsutil` invocation.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The executable could not be started at all (not installed, not on PATH, ...).
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran and exited unsuccessfully.
    #[error("`{command}` exited with {}: {stderr}", describe_code(.code))]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl StorageError {
    /// Exit code of the failed command, if it exited normally with a non-zero status.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            StorageError::Failed { code: Some(code), .. } if *code != 0 => Some(*code),
            _ => None,
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Top-level error returned by [`crate::publish::publish`].
#[derive(Error, Debug)]
pub enum PublishError {
    /// The model file the training step produces is not present locally.
    #[error(
        "model artifact not found at {}; run the training step first to produce it",
        .path.display()
    )]
    MissingArtifact { path: PathBuf },

    /// The destination bucket does not exist or is not accessible.
    #[error("bucket gs://{bucket} not found or not accessible; create it with:\n  {create_command}")]
    BucketNotFound {
        bucket: String,
        create_command: String,
    },

    /// A delegated command returned non-zero (or could not be run).
    #[error("{step} failed: {source}")]
    ExternalCallFailure {
        step: &'static str,
        #[source]
        source: StorageError,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The publish report could not be written.
    #[error("failed to write publish report to {}: {source}", .path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PublishError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            PublishError::MissingArtifact { .. } | PublishError::BucketNotFound { .. } => 1,
            PublishError::ExternalCallFailure { source, .. } => source.exit_code().unwrap_or(1),
            PublishError::Config(_) => 2,
            PublishError::Report { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(code: Option<i32>) -> StorageError {
        StorageError::Failed {
            command: "gsutil rsync".to_string(),
            code,
            stderr: "boom".to_string(),
        }
    }

    #[test]
    fn user_correctable_failures_exit_with_one() {
        let missing = PublishError::MissingArtifact {
            path: PathBuf::from("model_artifacts/model.joblib"),
        };
        let bucket = PublishError::BucketNotFound {
            bucket: "b0".to_string(),
            create_command: "gsutil mb -p p -l r gs://b0".to_string(),
        };
        assert_eq!(missing.exit_code(), 1);
        assert_eq!(bucket.exit_code(), 1);
    }

    #[test]
    fn external_failure_propagates_command_status() {
        let err = PublishError::ExternalCallFailure {
            step: "sync",
            source: failed(Some(7)),
        };
        assert_eq!(err.exit_code(), 7);
    }

    #[test]
    fn signal_or_spawn_failure_falls_back_to_one() {
        let signalled = PublishError::ExternalCallFailure {
            step: "sync",
            source: failed(None),
        };
        let spawn = PublishError::ExternalCallFailure {
            step: "set project",
            source: StorageError::Spawn {
                program: "gcloud".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            },
        };
        assert_eq!(signalled.exit_code(), 1);
        assert_eq!(spawn.exit_code(), 1);
    }

    #[test]
    fn missing_artifact_message_points_at_training() {
        let err = PublishError::MissingArtifact {
            path: PathBuf::from("artifacts/model.joblib"),
        };
        let msg = err.to_string();
        assert!(msg.contains("artifacts/model.joblib"));
        assert!(msg.contains("training"));
    }
}
