use std::sync::Arc;

use chrono::Weekday;
use log::{debug, info};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::store::{AlertStore, StoreSnapshot};
use super::types::{Alert, AlertStatus, Severity, Stats};
use super::view::{self, FilterCriteria};

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub generation: u64,
    pub criteria: FilterCriteria,
    pub stats: Option<Stats>,
    /// Alerts matching `criteria`, newest first.
    pub alerts: Vec<Alert>,
    pub total_known: usize,
    pub zones: Vec<String>,
    pub by_scenario: Vec<(String, usize)>,
    pub by_weekday: Vec<(Weekday, usize)>,
    pub by_hour: Vec<usize>,
    pub by_severity: Vec<(Severity, usize)>,
    pub by_status: Vec<(AlertStatus, usize)>,
}

pub fn build_dashboard(snapshot: &StoreSnapshot, criteria: &FilterCriteria) -> Dashboard {
    let alerts = view::filter_alerts(&snapshot.alerts, criteria);

    Dashboard {
        generation: snapshot.generation,
        criteria: criteria.clone(),
        stats: snapshot.stats.clone(),
        total_known: snapshot.alerts.len(),
        zones: view::known_zones(&snapshot.alerts),
        by_scenario: view::aggregate_by_scenario(&alerts),
        by_weekday: view::aggregate_by_weekday(&alerts).to_vec(),
        by_hour: view::aggregate_by_hour(&alerts).to_vec(),
        by_severity: view::severity_breakdown(&alerts),
        by_status: view::status_breakdown(&alerts),
        alerts,
    }
}

/// Rebuilds the dashboard whenever the store generation or the criteria
/// move. Returns the receiver renderers should watch.
pub fn spawn_dashboard_refresher(
    store: Arc<AlertStore>,
    mut criteria_rx: watch::Receiver<FilterCriteria>,
    cancel_token: CancellationToken,
) -> (watch::Receiver<Arc<Dashboard>>, JoinHandle<()>) {
    let mut changes = store.subscribe();
    let initial = build_dashboard(&store.snapshot(), &criteria_rx.borrow_and_update());
    let (tx, rx) = watch::channel(Arc::new(initial));

    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                res = changes.changed() => if res.is_err() { break },
                res = criteria_rx.changed() => if res.is_err() { break },
                _ = cancel_token.cancelled() => break,
            }

            let criteria = criteria_rx.borrow_and_update().clone();
            changes.borrow_and_update();
            let dashboard = build_dashboard(&store.snapshot(), &criteria);
            debug!(
                "Dashboard: generation {}, {} of {} alerts shown",
                dashboard.generation,
                dashboard.alerts.len(),
                dashboard.total_known
            );

            if tx.send(Arc::new(dashboard)).is_err() {
                break;
            }
        }
        info!("Core: Dashboard refresher stopped");
    });

    (rx, handle)
}
