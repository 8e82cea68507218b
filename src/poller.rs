//! Watches assets move through the tiling pipeline.
//!
//! The service drives every transition; a poller only fetches snapshots until it
//! sees a terminal status, then reports that snapshot as its outcome.

use crate::client::IonClient;
use crate::config::PollOptions;
use crate::error::IonError;
use crate::types::{AssetId, AssetMetadata, AssetStatus};
use futures_util::future::join_all;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

const SUPPORT_CONTACT: &str = "support@cesium.com";

/// What a poller does after observing a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    /// Check again after one poll interval.
    Reschedule,
    /// Stop; the status is terminal.
    Finished,
}

impl PollStep {
    pub fn for_status(status: AssetStatus) -> Self {
        if status.is_terminal() {
            PollStep::Finished
        } else {
            PollStep::Reschedule
        }
    }
}

/// The result of polling one asset.
#[derive(Debug)]
pub struct PollOutcome {
    pub asset_id: AssetId,
    /// The terminal snapshot, or why polling stopped early.
    pub result: Result<AssetMetadata, IonError>,
}

impl PollOutcome {
    /// The terminal status, if polling reached one.
    pub fn status(&self) -> Option<AssetStatus> {
        self.result.as_ref().ok().map(|asset| asset.status)
    }
}

/// What a poller observed in one status snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub step: PollStep,
    /// Where the finished asset can be viewed; only set for `Complete`.
    pub viewer_url: Option<Url>,
}

/// Logs the line for one status snapshot and decides whether to keep polling.
pub fn report_status(client: &IonClient, asset: &AssetMetadata) -> StatusReport {
    let label = asset.label();
    let mut viewer_url = None;
    match asset.status {
        AssetStatus::Complete => {
            info!("{} successfully", label);
            match client.viewer_url(&asset.id) {
                Ok(url) => {
                    info!("View in ion: {}", url);
                    viewer_url = Some(url);
                }
                Err(e) => warn!(asset_id = %asset.id, "could not build viewer link: {}", e),
            }
        }
        AssetStatus::DataError => {
            warn!("ion detected a problem with the uploaded data for {}.", label);
        }
        AssetStatus::Error => {
            warn!(
                "An unknown tiling error occurred, please contact {} regarding {}",
                SUPPORT_CONTACT, label
            );
        }
        AssetStatus::NotStarted => {
            info!("Tiling pipeline initializing for {}", label);
        }
        AssetStatus::InProgress | AssetStatus::Unknown => {
            info!("{} is {}% complete.", label, asset.percent_complete);
        }
    }
    StatusReport {
        step: PollStep::for_status(asset.status),
        viewer_url,
    }
}

/// Polls one asset until it reaches a terminal status.
///
/// Every non-terminal snapshot schedules exactly one more check, `options.interval`
/// later. Polling also stops when `cancel` fires, after `options.max_attempts`
/// snapshots, or once `options.timeout` has passed, including while a status
/// request is still in flight. A failed status request ends polling with that error.
pub async fn wait_until_ready(
    client: &IonClient,
    asset_id: &AssetId,
    options: &PollOptions,
    cancel: &CancellationToken,
) -> Result<AssetMetadata, IonError> {
    let deadline = options.timeout.map(|timeout| Instant::now() + timeout);
    let mut attempts = 0u32;

    loop {
        let asset = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(IonError::Cancelled),
            _ = until(deadline) => {
                return Err(IonError::PollTimeout {
                    asset_id: asset_id.to_string(),
                });
            }
            asset = client.get_asset(asset_id) => asset?,
        };
        attempts += 1;

        if report_status(client, &asset).step == PollStep::Finished {
            return Ok(asset);
        }

        if options.max_attempts.is_some_and(|max| attempts >= max) {
            return Err(IonError::PollLimitReached {
                asset_id: asset_id.to_string(),
                attempts,
            });
        }
        if deadline.is_some_and(|deadline| Instant::now() + options.interval > deadline) {
            return Err(IonError::PollTimeout {
                asset_id: asset_id.to_string(),
            });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(IonError::Cancelled),
            _ = sleep(options.interval) => {}
        }
    }
}

/// Resolves at `deadline`, or never without one.
async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Starts one poller per asset and waits for all of them.
///
/// Each poller gets a child of `cancel`, so cancelling it stops them all. One
/// poller failing does not stop the others; outcomes come back in `asset_ids` order.
pub async fn poll_assets(
    client: &IonClient,
    asset_ids: &[AssetId],
    options: &PollOptions,
    cancel: &CancellationToken,
) -> Vec<PollOutcome> {
    info!(count = asset_ids.len(), "Monitoring tiling progress");

    let pollers = asset_ids.iter().map(|asset_id| {
        let token = cancel.child_token();
        async move {
            let result = wait_until_ready(client, asset_id, options, &token).await;
            PollOutcome {
                asset_id: asset_id.clone(),
                result,
            }
        }
    });

    join_all(pollers).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(status: &str) -> AssetMetadata {
        serde_json::from_value(json!({
            "id": 4242,
            "name": "quarry",
            "status": status,
            "percentComplete": 50
        }))
        .unwrap()
    }

    fn client() -> IonClient {
        IonClient::new_with_url("token", "https://api.example.com").unwrap()
    }

    #[test]
    fn complete_reports_viewer_url_with_asset_id() {
        let report = report_status(&client(), &snapshot("COMPLETE"));
        assert_eq!(report.step, PollStep::Finished);
        let url = report.viewer_url.expect("viewer url");
        assert!(url.as_str().ends_with("/4242"));
    }

    #[test]
    fn other_statuses_have_no_viewer_url() {
        for status in ["NOT_STARTED", "IN_PROGRESS", "DATA_ERROR", "ERROR"] {
            let report = report_status(&client(), &snapshot(status));
            assert_eq!(report.viewer_url, None, "{status}");
        }
        assert_eq!(
            report_status(&client(), &snapshot("IN_PROGRESS")).step,
            PollStep::Reschedule
        );
        assert_eq!(
            report_status(&client(), &snapshot("ERROR")).step,
            PollStep::Finished
        );
    }

    #[test]
    fn terminal_statuses_finish() {
        assert_eq!(PollStep::for_status(AssetStatus::Complete), PollStep::Finished);
        assert_eq!(PollStep::for_status(AssetStatus::DataError), PollStep::Finished);
        assert_eq!(PollStep::for_status(AssetStatus::Error), PollStep::Finished);
    }

    #[test]
    fn pending_statuses_reschedule() {
        assert_eq!(PollStep::for_status(AssetStatus::NotStarted), PollStep::Reschedule);
        assert_eq!(PollStep::for_status(AssetStatus::InProgress), PollStep::Reschedule);
        assert_eq!(PollStep::for_status(AssetStatus::Unknown), PollStep::Reschedule);
    }
}
