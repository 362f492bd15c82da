use std::sync::Arc;

use anyhow::Result;
use log::{info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backend::{self, PushEvent};
use crate::commands::Command;
use crate::config::EnvConfig;
use crate::core::{
    spawn_dashboard_refresher, spawn_notification_processor, spawn_push_processor,
    spawn_snapshot_fetcher, AlertStore, Dashboard, FilterCriteria, NotificationPolicy, Notifier,
    NotifyEvent,
};

const NOTIFY_CHANNEL_CAPACITY: usize = 256;
const PUSH_CHANNEL_CAPACITY: usize = 100;

/// One console session: the store plus every task feeding or reading it.
/// Created on start, torn down by [`Console::shutdown`].
pub struct Console {
    pub store: Arc<AlertStore>,
    cancel_token: CancellationToken,
    criteria_tx: watch::Sender<FilterCriteria>,
    dashboard_rx: watch::Receiver<Arc<Dashboard>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Console {
    /// Must be called from inside a tokio runtime.
    pub fn start(config: &EnvConfig, criteria: FilterCriteria, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let cancel_token = CancellationToken::new();
        let client = Arc::new(backend::init(&config.backend_url, config.request_timeout)?);

        let (notify_tx, notify_rx) = mpsc::channel::<NotifyEvent>(NOTIFY_CHANNEL_CAPACITY);
        let store = Arc::new(AlertStore::with_notifier(notify_tx.clone()));
        let (push_tx, push_rx) = mpsc::channel::<PushEvent>(PUSH_CHANNEL_CAPACITY);
        let (criteria_tx, criteria_rx) = watch::channel(criteria);

        let policy = NotificationPolicy {
            notify_critical: config.notify_critical,
        };

        let mut tasks = vec![
            spawn_notification_processor(notify_rx, notifier, policy, cancel_token.clone()),
            spawn_push_processor(push_rx, store.clone(), notify_tx, cancel_token.clone()),
            backend::spawn_event_listener(config.push_url.clone(), cancel_token.clone(), push_tx),
            spawn_snapshot_fetcher(client, store.clone(), config.fetch_interval, cancel_token.clone()),
        ];

        let (dashboard_rx, refresher) =
            spawn_dashboard_refresher(store.clone(), criteria_rx, cancel_token.clone());
        tasks.push(refresher);

        info!("✅ Console started.");

        Ok(Self {
            store,
            cancel_token,
            criteria_tx,
            dashboard_rx,
            tasks,
        })
    }

    pub fn dashboard(&self) -> watch::Receiver<Arc<Dashboard>> {
        self.dashboard_rx.clone()
    }

    pub fn criteria(&self) -> FilterCriteria {
        self.criteria_tx.borrow().clone()
    }

    /// Only a real change wakes the dashboard refresher.
    pub fn set_criteria(&self, criteria: FilterCriteria) {
        self.criteria_tx.send_if_modified(|current| {
            if *current == criteria {
                return false;
            }
            *current = criteria;
            true
        });
    }

    pub fn run_command(&self, command: Command) -> Result<String> {
        let mut criteria = self.criteria();
        let reply = command.apply(&self.store, &mut criteria)?;
        self.set_criteria(criteria);
        Ok(reply)
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Stops every task and closes the store so nothing late can write to it.
    pub async fn shutdown(self) {
        self.cancel_token.cancel();
        self.store.close();

        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Console task ended abnormally: {}", e);
            }
        }

        info!("Console stopped with {} known alerts.", self.store.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::notification::tests::RecordingNotifier;
    use crate::core::notification::NotificationLevel;
    use crate::core::testing::serve_http;
    use crate::core::view::Selector;
    use crate::core::types::Severity;
    use std::time::Duration;

    const ALERTS_BODY: &str = r#"[
        {"id": 1, "timestamp": "2024-03-04T10:00:00Z", "camera": "CAM-01", "zone": "A", "event": "Fence Damage Detected", "severity": "critical", "status": "active"},
        {"id": 2, "timestamp": "2024-03-04T10:05:00Z", "camera": "CAM-02", "zone": "B", "event": "Climbing Hazard", "severity": "high", "status": "active"}
    ]"#;

    #[tokio::test]
    async fn session_fetches_filters_notifies_and_shuts_down() {
        let addr = serve_http(vec![
            ("/stats", 200, r#"{"total_alerts": 2, "active_cameras": 1, "uptime": 60}"#.to_string()),
            ("/alerts", 200, ALERTS_BODY.to_string()),
        ])
        .await;
        let dead = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_addr = dead.local_addr().unwrap();
        drop(dead);

        let config = EnvConfig::from_lookup(|key| match key {
            "BACKEND_URL" => Some(format!("http://{}", addr)),
            "PUSH_URL" => Some(format!("ws://{}/ws", dead_addr)),
            "FETCH_INTERVAL_S" => Some("2".to_string()),
            "REQUEST_TIMEOUT_S" => Some("1".to_string()),
            _ => None,
        })
        .unwrap()
        .validate()
        .unwrap();

        let notifier = Arc::new(RecordingNotifier::default());
        let console = Console::start(&config, FilterCriteria::default(), notifier.clone()).unwrap();
        let mut dashboards = console.dashboard();

        let loaded = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                dashboards.changed().await.unwrap();
                if dashboards.borrow_and_update().alerts.len() == 2 {
                    break;
                }
            }
        })
        .await;
        assert!(loaded.is_ok(), "snapshot never reached the dashboard");

        console.run_command("severity critical".parse().unwrap()).unwrap();
        assert_eq!(console.criteria().severity, Selector::Only(Severity::Critical));
        tokio::time::timeout(Duration::from_secs(2), dashboards.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(dashboards.borrow_and_update().alerts.len(), 1);

        let high_notifications = || -> Vec<_> {
            notifier
                .taken()
                .into_iter()
                .filter(|n| n.level == NotificationLevel::High)
                .collect()
        };
        let delivered = tokio::time::timeout(Duration::from_secs(2), async {
            while high_notifications().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(delivered.is_ok(), "critical alert never notified");

        let store = console.store.clone();
        console.shutdown().await;
        assert!(store.is_closed());
        assert_eq!(store.len(), 2);

        let high = high_notifications();
        assert_eq!(high.len(), 1);
        assert_eq!(high[0].title, "Fence Damage Detected");
    }
}
