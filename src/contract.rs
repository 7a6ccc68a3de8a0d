//! # contract: the cloud storage collaborator
//!
//! Publishing never talks to Cloud Storage directly. Every remote effect goes
//! through the [`CloudStorage`] trait, so the orchestration in
//! [`crate::publish`] can be driven by the real `gcloud`/`gsutil` wrapper
//! ([`crate::gcloud::GcloudCli`]) or by a mock in tests.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`; `MockCloudStorage` is exported under
//!   the `test-export-mocks` feature so integration tests can use it.

use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::config::DestinationUri;
use crate::error::StorageError;

/// How a directory sync should behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Delete destination objects that have no counterpart in the source.
    pub mirror: bool,
    /// Transfer files in parallel where the tool supports it.
    pub parallel: bool,
    /// Report what would change without changing anything.
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            mirror: true,
            parallel: true,
            dry_run: false,
        }
    }
}

/// What a sync changed (or would change, under `dry_run`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub copied: usize,
    pub removed: usize,
    pub dry_run: bool,
}

impl SyncSummary {
    /// True when the destination already matched the source.
    pub fn is_unchanged(&self) -> bool {
        self.copied == 0 && self.removed == 0
    }
}

/// The external operations a publish run consumes.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CloudStorage: Send + Sync {
    /// Make `project_id` the active project for subsequent calls.
    async fn set_project_context(&self, project_id: &str) -> Result<(), StorageError>;

    /// Whether the bucket exists and is visible to the caller.
    async fn bucket_exists(&self, bucket_name: &str) -> Result<bool, StorageError>;

    /// Recursively sync `local_path` into `destination`.
    async fn sync_directory(
        &self,
        local_path: &Path,
        destination: &DestinationUri,
        options: SyncOptions,
    ) -> Result<SyncSummary, StorageError>;

    /// Object URIs under `destination`.
    async fn list_objects(
        &self,
        destination: &DestinationUri,
        recursive: bool,
    ) -> Result<Vec<String>, StorageError>;
}
