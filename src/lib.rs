//! model-publish: validate a trained model artifact and mirror it to a
//! versioned Cloud Storage path for later deployment.
//!
//! The pipeline lives in [`publish`]; remote effects go through the
//! [`contract::CloudStorage`] trait, implemented over `gcloud`/`gsutil` by
//! [`gcloud::GcloudCli`].

pub mod cli;
pub mod config;
pub mod contract;
pub mod error;
pub mod gcloud;
pub mod load_config;
pub mod publish;

pub use cli::{run, Cli, Commands};
pub use config::{DestinationUri, PublishConfig};
pub use error::{PublishError, StorageError};
pub use publish::{publish, PublishReport};
