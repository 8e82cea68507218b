//! The end-to-end run: create the asset, upload its source data, mark the upload
//! complete, then watch every created asset until tiling ends.

use crate::client::IonClient;
use crate::config::Config;
use crate::error::IonError;
use crate::poller::{poll_assets, PollOutcome};
use crate::types::CreateAssetResponse;
use crate::upload::{upload_file, UploadProgress, UploadedObject};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Everything a finished run produced.
#[derive(Debug)]
pub struct WorkflowReport {
    pub created: CreateAssetResponse,
    pub uploaded: UploadedObject,
    /// One entry per created asset, primary first.
    pub outcomes: Vec<PollOutcome>,
}

impl WorkflowReport {
    /// `true` when every poller reached a terminal status (even a failed one).
    pub fn all_terminal(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.result.is_ok())
    }
}

/// Runs the full workflow with a client built from `config`.
pub async fn run(config: &Config, cancel: CancellationToken) -> Result<WorkflowReport, IonError> {
    let client = IonClient::from_config(config)?;
    run_with_client(&client, config, cancel).await
}

/// Runs the full workflow with an existing client.
///
/// Creation, upload and completion run strictly in order and any failure stops the
/// run before the next step. Polling failures are per asset and come back in
/// [`WorkflowReport::outcomes`].
pub async fn run_with_client(
    client: &IonClient,
    config: &Config,
    cancel: CancellationToken,
) -> Result<WorkflowReport, IonError> {
    // Fail before creating an asset that could never receive data.
    tokio::fs::metadata(&config.input).await?;

    // Step 1: describe the data.
    let request = config.create_request();
    info!("Creating new asset: {}", request.name);
    let created = client.create_asset(&request).await?;

    info!("Created {}", created.asset_metadata.label());
    for additional in &created.additional_assets {
        info!("Created {}", additional.label());
    }

    // Step 2: upload it.
    info!("Asset created. Uploading {}", config.input.display());
    let uploaded = upload_file(
        &created.upload_location,
        &config.input,
        &config.upload_filename,
        &config.upload,
        &cancel,
        |progress: UploadProgress| info!("Upload progress: {}%", progress.percentage()),
    )
    .await?;

    // Step 3: tell the service we are done.
    client.complete_upload(&created.on_complete).await?;

    // Step 4: watch tiling for every asset.
    let asset_ids = created.asset_ids();
    let outcomes = poll_assets(client, &asset_ids, &config.poll, &cancel).await;

    Ok(WorkflowReport {
        created,
        uploaded,
        outcomes,
    })
}
