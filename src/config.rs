// model-publish/src/config.rs

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

pub const DEFAULT_REGION: &str = "us-central1";
pub const DEFAULT_LOCAL_DIR: &str = "model_artifacts";
pub const DEFAULT_ARTIFACT_FILE: &str = "model.joblib";
pub const DEFAULT_GCLOUD_BIN: &str = "gcloud";
pub const DEFAULT_GSUTIL_BIN: &str = "gsutil";

/// Everything a single publish run needs. Built once by
/// [`crate::load_config::load_config`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishConfig {
    pub project: String,
    pub region: String,
    pub bucket: String,
    /// Destination folder segment under the bucket.
    pub model_name: String,
    pub local_dir: PathBuf,
    /// File inside `local_dir` whose presence gates the publish.
    pub artifact_file: String,
    pub parallel: bool,
    pub dry_run: bool,
    pub gcloud_bin: PathBuf,
    pub gsutil_bin: PathBuf,
    pub report_path: Option<PathBuf>,
}

impl PublishConfig {
    /// Config with the given identifiers and defaults for everything else.
    pub fn new(
        project: impl Into<String>,
        bucket: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            region: DEFAULT_REGION.to_string(),
            bucket: bucket.into(),
            model_name: model_name.into(),
            local_dir: PathBuf::from(DEFAULT_LOCAL_DIR),
            artifact_file: DEFAULT_ARTIFACT_FILE.to_string(),
            parallel: true,
            dry_run: false,
            gcloud_bin: PathBuf::from(DEFAULT_GCLOUD_BIN),
            gsutil_bin: PathBuf::from(DEFAULT_GSUTIL_BIN),
            report_path: None,
        }
    }

    pub fn with_local_dir(mut self, local_dir: impl AsRef<Path>) -> Self {
        self.local_dir = local_dir.as_ref().to_path_buf();
        self
    }

    /// Bucket name without scheme or surrounding slashes.
    pub fn bucket_name(&self) -> &str {
        normalise_bucket(&self.bucket)
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.local_dir.join(&self.artifact_file)
    }

    /// Fails when the bucket or model name normalises to nothing.
    pub fn destination(&self) -> Result<DestinationUri, String> {
        DestinationUri::new(&self.bucket, &self.model_name)
    }

    /// The command a user should run when the bucket is missing.
    pub fn bucket_create_command(&self) -> String {
        format!(
            "gsutil mb -p {} -l {} gs://{}",
            self.project,
            self.region,
            self.bucket_name()
        )
    }

    /// Checks that every required field is present and well-formed.
    pub fn validate(&self) -> Result<(), String> {
        if self.project.trim().is_empty() {
            return Err("project must be set".to_string());
        }
        if self.region.trim().is_empty() {
            return Err("region must be set".to_string());
        }
        let bucket = self.bucket_name();
        if bucket.is_empty() {
            return Err("bucket must be set".to_string());
        }
        if !is_valid_bucket_name(bucket) {
            return Err(format!(
                "bucket name {bucket:?} is not a valid Cloud Storage bucket name"
            ));
        }
        if normalise_model(&self.model_name).is_empty() {
            return Err("model_name must be set".to_string());
        }
        if self.artifact_file.trim().is_empty() {
            return Err("artifact_file must be set".to_string());
        }
        Ok(())
    }

    pub fn trace_loaded(&self) {
        info!(
            project = %self.project,
            region = %self.region,
            bucket = %self.bucket_name(),
            model_name = %self.model_name,
            local_dir = %self.local_dir.display(),
            "Loaded PublishConfig"
        );
        debug!(?self, "PublishConfig loaded (full debug)");
    }
}

// One dot-separated component: up to 63 lowercase letters, digits, dashes and
// underscores, starting and ending with a letter or digit.
fn bucket_component_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9](?:[a-z0-9_-]{0,61}[a-z0-9])?$").expect("bucket name pattern is valid")
    })
}

// Dotted names may run to 222 chars as long as every component fits.
fn is_valid_bucket_name(bucket: &str) -> bool {
    bucket.len() <= 222
        && bucket
            .split('.')
            .all(|component| bucket_component_pattern().is_match(component))
}

fn normalise_bucket(bucket: &str) -> &str {
    let bucket = bucket.trim();
    bucket
        .strip_prefix("gs://")
        .unwrap_or(bucket)
        .trim_matches('/')
}

/// Model path with whitespace and empty segments removed: `" /team//m1/ "` is `team/m1`.
fn normalise_model(model_name: &str) -> String {
    model_name
        .split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Fully qualified remote folder artifacts are published to:
/// always `gs://<bucket>/<model>/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DestinationUri(String);

impl DestinationUri {
    pub fn new(bucket: &str, model_name: &str) -> Result<Self, String> {
        let bucket = normalise_bucket(bucket);
        if bucket.is_empty() {
            return Err("bucket must not be empty".to_string());
        }
        let model = normalise_model(model_name);
        if model.is_empty() {
            return Err(format!("model name {model_name:?} has no path segments"));
        }
        Ok(DestinationUri(format!("gs://{bucket}/{model}/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DestinationUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_is_bucket_then_model_with_trailing_slash() {
        assert_eq!(DestinationUri::new("b0", "m1").unwrap().as_str(), "gs://b0/m1/");
    }

    #[test]
    fn destination_never_doubles_slashes() {
        assert_eq!(
            DestinationUri::new("gs://b0/", "/m1/").unwrap().as_str(),
            "gs://b0/m1/"
        );
        assert_eq!(
            DestinationUri::new("b0", " team / /m1/ ").unwrap().as_str(),
            "gs://b0/team/m1/"
        );
    }

    #[test]
    fn destination_rejects_blank_model_or_bucket() {
        for model in ["", "  ", "/", " / ", "//"] {
            assert!(
                DestinationUri::new("b0", model).is_err(),
                "model {model:?} should be rejected"
            );
        }
        assert!(DestinationUri::new("gs://", "m1").is_err());
        assert!(PublishConfig::new("proj", "b0", "").destination().is_err());
    }

    #[test]
    fn new_config_applies_defaults() {
        let config = PublishConfig::new("proj", "b0", "m1");
        assert_eq!(config.region, DEFAULT_REGION);
        assert_eq!(config.local_dir, PathBuf::from("model_artifacts"));
        assert_eq!(
            config.artifact_path(),
            PathBuf::from("model_artifacts").join("model.joblib")
        );
        assert!(config.parallel);
        assert!(!config.dry_run);
    }

    #[test]
    fn create_command_names_project_region_and_bucket() {
        let config = PublishConfig::new("proj-1", "gs://b0", "m1");
        assert_eq!(
            config.bucket_create_command(),
            "gsutil mb -p proj-1 -l us-central1 gs://b0"
        );
    }

    #[test]
    fn validate_accepts_well_formed_config() {
        assert!(PublishConfig::new("proj", "my-bucket.v2", "sklogit_pd_1m")
            .validate()
            .is_ok());
    }

    #[test]
    fn validate_rejects_bad_bucket_names() {
        for bucket in ["", "B0", "-bucket", "bucket_", "bucket with space"] {
            let err = PublishConfig::new("proj", bucket, "m1").validate();
            assert!(err.is_err(), "bucket {bucket:?} should be rejected");
        }
    }

    #[test]
    fn validate_rejects_missing_model_or_project() {
        for model in ["", "/", "  ", " / "] {
            assert!(
                PublishConfig::new("proj", "b00", model).validate().is_err(),
                "model {model:?} should be rejected"
            );
        }
        assert!(PublishConfig::new(" ", "b00", "m1").validate().is_err());
    }

    #[test]
    fn dotted_bucket_names_may_exceed_63_chars() {
        let component = "a".repeat(63);
        let dotted = format!("{component}.{component}.{component}");
        assert!(PublishConfig::new("proj", dotted.as_str(), "m1").validate().is_ok());

        let undotted = "a".repeat(64);
        let long_component = format!("{}.b0", "a".repeat(64));
        let too_long = vec!["a".repeat(50); 5].join(".");
        for bucket in [undotted, long_component, too_long, "a..b".to_string()] {
            assert!(
                PublishConfig::new("proj", bucket.as_str(), "m1").validate().is_err(),
                "bucket {bucket:?} should be rejected"
            );
        }
    }
}
