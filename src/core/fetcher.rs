use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, error, info};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::backend::BackendClient;
use super::store::{AlertStore, MergeOutcome};

#[derive(Debug)]
pub struct CycleReport {
    pub outcome: MergeOutcome,
    /// Records in the list that failed to decode.
    pub dropped: usize,
}

/// One pull: stats and alert list. Either both land in the store as one
/// mutation or nothing does.
pub async fn run_cycle(client: &BackendClient, store: &AlertStore) -> Result<CycleReport> {
    let (stats, batch) = tokio::try_join!(client.fetch_stats(), client.fetch_alerts())?;

    let outcome = store
        .apply_snapshot(stats, batch.alerts)
        .context("Snapshot not applied")?;

    Ok(CycleReport {
        outcome,
        dropped: batch.dropped,
    })
}

pub fn spawn_snapshot_fetcher(
    client: Arc<BackendClient>,
    store: Arc<AlertStore>,
    period: Duration,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        start_snapshot_fetcher(client, store, period, cancel_token).await;
    })
}

/// The cycle runs inline, so a slow cycle delays the next tick instead of
/// overlapping it; ticks missed meanwhile are skipped.
async fn start_snapshot_fetcher(
    client: Arc<BackendClient>,
    store: Arc<AlertStore>,
    period: Duration,
    cancel_token: CancellationToken,
) {
    let mut interval = interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("⚙️ Core: Snapshot fetcher started ({:?}, {})", period, client.base_url());

    loop {
        tokio::select! {
            _ = interval.tick() => {
                tokio::select! {
                    result = run_cycle(&client, &store) => match result {
                        Ok(report) => debug!(
                            "Snapshot applied: generation {}, {} new, {} dropped",
                            report.outcome.generation,
                            report.outcome.inserted.len(),
                            report.dropped
                        ),
                        Err(e) => error!("Snapshot fetch failed: {:#}", e),
                    },
                    _ = cancel_token.cancelled() => break,
                }
            }
            _ = cancel_token.cancelled() => break,
        }
    }

    info!("⚙️ Core: Snapshot fetcher was stopped.");
}
