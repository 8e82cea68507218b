//! A Rust SDK and command-line tool for turning reconstruction datasets into 3D tiles.
//!
//! A run creates an asset on the tiling service, uploads the source file to the
//! temporary object-storage location the service hands back, reports the upload as
//! complete, and then watches the primary asset and any derived assets until the
//! tiling pipeline finishes.
//!
//! ## Features
//! - Typed request and response models for the asset REST API.
//! - S3-compatible upload with single-request and multipart paths and progress events.
//! - Concurrent status polling with interval, attempt, timeout and cancellation controls.
//! - Environment-driven configuration.
//!
//! ```no_run
//! # use ion_tiling::{workflow, Config};
//! # use tokio_util::sync::CancellationToken;
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let report = workflow::run(&config, CancellationToken::new()).await?;
//! for outcome in &report.outcomes {
//!     println!("{}: {:?}", outcome.asset_id, outcome.status());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod poller;
pub mod types;
pub mod upload;
pub mod workflow;

pub use client::IonClient;
pub use config::{Config, PollOptions, UploadOptions};
pub use error::IonError;
pub use poller::{poll_assets, report_status, wait_until_ready, PollOutcome, PollStep, StatusReport};
pub use types::{
    AssetId, AssetMetadata, AssetOptions, AssetStatus, AssetType, CreateAssetRequest,
    CreateAssetResponse, MeshQuality, OnComplete, OutputFormats, SourceType, UploadLocation,
};
pub use upload::{upload_file, UploadProgress, UploadedObject};
pub use workflow::WorkflowReport;
