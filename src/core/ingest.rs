use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backend::PushEvent;
use super::error::StoreError;
use super::notification::NotifyEvent;
use super::store::AlertStore;

/// Feeds push-channel events into the store. Connection events go straight
/// to the dispatcher.
pub fn spawn_push_processor(
    mut rx: mpsc::Receiver<PushEvent>,
    store: Arc<AlertStore>,
    notify_tx: mpsc::Sender<NotifyEvent>,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    if let Err(StoreError::Closed) = handle_push_event(event, &store, &notify_tx) {
                        break;
                    }
                }
                _ = cancel_token.cancelled() => break,
            }
        }
        info!("Core: Push processor stopped");
    })
}

fn handle_push_event(
    event: PushEvent,
    store: &AlertStore,
    notify_tx: &mpsc::Sender<NotifyEvent>,
) -> Result<(), StoreError> {
    match event {
        PushEvent::Connected => {
            if let Err(e) = notify_tx.try_send(NotifyEvent::Connected) {
                warn!("Core: connection notice dropped: {}", e);
            }
        }
        PushEvent::Alert(alert) => {
            let outcome = store.merge_incremental(alert)?;
            debug!(
                "Core: push merged, generation {} (changed: {})",
                outcome.generation,
                outcome.changed()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::alert;
    use crate::core::types::{AlertId, AlertStatus, Severity};
    use std::time::Duration;

    #[tokio::test]
    async fn push_events_reach_store_and_dispatcher() {
        let (notify_tx, mut notify_rx) = mpsc::channel(16);
        let store = Arc::new(AlertStore::with_notifier(notify_tx.clone()));
        let (push_tx, push_rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let handle = spawn_push_processor(push_rx, store.clone(), notify_tx, cancel.clone());

        push_tx.send(PushEvent::Connected).await.unwrap();
        push_tx
            .send(PushEvent::Alert(alert("7", "A", Severity::Critical, AlertStatus::Logged)))
            .await
            .unwrap();
        push_tx
            .send(PushEvent::Alert(alert("7", "A", Severity::Critical, AlertStatus::Review)))
            .await
            .unwrap();
        drop(push_tx);

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("processor did not stop")
            .unwrap();

        assert_eq!(store.get(&AlertId::new("7")).unwrap().status, AlertStatus::Review);
        assert!(matches!(notify_rx.try_recv(), Ok(NotifyEvent::Connected)));
        assert!(matches!(notify_rx.try_recv(), Ok(NotifyEvent::NewAlerts(alerts)) if alerts.len() == 1));
        assert!(notify_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_store_stops_processor() {
        let (notify_tx, _notify_rx) = mpsc::channel(16);
        let store = Arc::new(AlertStore::new());
        store.close();
        let (push_tx, push_rx) = mpsc::channel(16);
        let handle = spawn_push_processor(push_rx, store.clone(), notify_tx, CancellationToken::new());

        push_tx
            .send(PushEvent::Alert(alert("1", "A", Severity::Low, AlertStatus::Logged)))
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("processor kept running on a closed store")
            .unwrap();
        assert!(store.is_empty());
    }
}
