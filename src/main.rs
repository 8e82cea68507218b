use ion_tiling::{workflow, AssetStatus, Config};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from a .env file if it exists.
    dotenvy::dotenv().ok();

    let log_env = std::env::var("ION_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(&log_env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_env_filter(env_filter)
        .init();

    let config = Config::from_env()?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping");
            on_interrupt.cancel();
        }
    });

    // Returned errors are printed once, by `main`'s `Result`.
    let report = workflow::run(&config, cancel).await?;

    let mut failed = 0usize;
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(asset) if asset.status == AssetStatus::Complete => {}
            Ok(asset) => info!(asset_id = %outcome.asset_id, status = ?asset.status, "tiling ended without output"),
            Err(e) => {
                error!(asset_id = %outcome.asset_id, "stopped watching asset: {}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} assets could not be watched to completion", failed, report.outcomes.len());
    }
    Ok(())
}
