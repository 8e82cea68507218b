//! This example watches an asset that was created earlier:
//! 1. Taking an existing asset ID from the command line.
//! 2. Polling the asset status until tiling ends.
//! 3. Printing the viewer link if tiling succeeded.
//!
//! To run this example, you must have the `ION_ACCESS_TOKEN` environment variable set.
//!
//! Usage:
//! `cargo run --example wait_for_asset <ASSET_ID>`

use ion_tiling::{wait_until_ready, AssetId, AssetStatus, IonClient, PollOptions};
use std::env;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from a .env file if it exists.
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_target(false).init();

    // Initialize the client from the ION_ACCESS_TOKEN environment variable.
    let client = IonClient::new(None)?;

    // 1. Get the asset ID from command-line arguments.
    let asset_id = env::args()
        .nth(1)
        .map(AssetId::new)
        .ok_or_else(|| anyhow::anyhow!("Please provide an asset ID as a command-line argument."))?;

    // 2. Wait for tiling to end.
    println!("\nWaiting for asset `{}` to finish tiling...", asset_id);
    let asset = match wait_until_ready(
        &client,
        &asset_id,
        &PollOptions::default(),
        &CancellationToken::new(),
    )
    .await
    {
        Ok(asset) => asset,
        Err(e) => {
            eprintln!("\nError waiting for asset: {}", e);
            return Ok(());
        }
    };

    // 3. Report the result.
    if asset.status == AssetStatus::Complete {
        println!("\nTiling finished: {}", client.viewer_url(&asset.id)?);
    } else {
        println!("\nTiling ended with status {:?}", asset.status);
    }

    Ok(())
}
