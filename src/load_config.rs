use crate::config::{
    PublishConfig, DEFAULT_ARTIFACT_FILE, DEFAULT_GCLOUD_BIN, DEFAULT_GSUTIL_BIN,
    DEFAULT_LOCAL_DIR, DEFAULT_REGION,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// On-disk YAML shape. Every field is optional so a file can carry as much or
/// as little of the config as the caller wants.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StaticConfig {
    project: Option<String>,
    region: Option<String>,
    bucket: Option<String>,
    model_name: Option<String>,
    local_dir: Option<PathBuf>,
    artifact_file: Option<String>,
    parallel: Option<bool>,
    dry_run: Option<bool>,
    gcloud_bin: Option<PathBuf>,
    gsutil_bin: Option<PathBuf>,
    report_path: Option<PathBuf>,
}

/// Values supplied on the command line (or through their env vars).
/// Anything set here wins over the config file.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub project: Option<String>,
    pub region: Option<String>,
    pub bucket: Option<String>,
    pub model_name: Option<String>,
    pub local_dir: Option<PathBuf>,
    pub artifact_file: Option<String>,
    pub parallel: Option<bool>,
    pub dry_run: Option<bool>,
    pub gcloud_bin: Option<PathBuf>,
    pub gsutil_bin: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
}

/// Builds the run's [`PublishConfig`] from an optional YAML file plus overrides.
/// Precedence is override > file > built-in default; the result is validated.
pub fn load_config(path: Option<&Path>, overrides: ConfigOverrides) -> Result<PublishConfig> {
    let file = match path {
        Some(path) => read_static_config(path)?,
        None => {
            info!("No config file given, using flags, environment and defaults");
            StaticConfig::default()
        }
    };

    let project = overrides
        .project
        .or(file.project)
        .context("project is required (--project, MODEL_PUBLISH_PROJECT or `project:` in the config file)")?;
    let bucket = overrides
        .bucket
        .or(file.bucket)
        .context("bucket is required (--bucket, MODEL_PUBLISH_BUCKET or `bucket:` in the config file)")?;
    let model_name = overrides
        .model_name
        .or(file.model_name)
        .context("model name is required (--model-name, MODEL_PUBLISH_MODEL_NAME or `model_name:` in the config file)")?;

    let config = PublishConfig {
        project,
        region: overrides
            .region
            .or(file.region)
            .unwrap_or_else(|| DEFAULT_REGION.to_string()),
        bucket,
        model_name,
        local_dir: overrides
            .local_dir
            .or(file.local_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCAL_DIR)),
        artifact_file: overrides
            .artifact_file
            .or(file.artifact_file)
            .unwrap_or_else(|| DEFAULT_ARTIFACT_FILE.to_string()),
        parallel: overrides.parallel.or(file.parallel).unwrap_or(true),
        dry_run: overrides.dry_run.or(file.dry_run).unwrap_or(false),
        gcloud_bin: overrides
            .gcloud_bin
            .or(file.gcloud_bin)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_GCLOUD_BIN)),
        gsutil_bin: overrides
            .gsutil_bin
            .or(file.gsutil_bin)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_GSUTIL_BIN)),
        report_path: overrides.report_path.or(file.report_path),
    };

    if let Err(reason) = config.validate() {
        error!(reason = %reason, "Invalid configuration");
        anyhow::bail!("Invalid configuration: {reason}");
    }

    config.trace_loaded();
    Ok(config)
}

fn read_static_config(path: &Path) -> Result<StaticConfig> {
    info!(config_path = ?path, "Loading configuration from file");

    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path, e)
    })?;

    // An empty file is a valid (empty) config.
    if content.trim().is_empty() {
        return Ok(StaticConfig::default());
    }

    let conf: StaticConfig = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML: {e}")
    })?;
    info!(config_path = ?path, "Parsed config YAML successfully");
    Ok(conf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_alone_are_enough() {
        let config = load_config(
            None,
            ConfigOverrides {
                project: Some("proj".into()),
                bucket: Some("b0".into()),
                model_name: Some("m1".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(config, PublishConfig::new("proj", "b0", "m1"));
    }

    #[test]
    fn missing_bucket_is_reported_by_name() {
        let err = load_config(
            None,
            ConfigOverrides {
                project: Some("proj".into()),
                model_name: Some("m1".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("bucket"), "got: {err}");
    }

    #[test]
    fn invalid_values_fail_validation() {
        let err = load_config(
            None,
            ConfigOverrides {
                project: Some("proj".into()),
                bucket: Some("Not A Bucket".into()),
                model_name: Some("m1".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"), "got: {err}");
    }
}
