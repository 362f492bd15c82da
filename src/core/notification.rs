use std::sync::Arc;

use log::{info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::types::{Alert, Severity};

/// Input of the dispatcher.
#[derive(Debug, Clone)]
pub enum NotifyEvent {
    /// Alert ids the store had never seen before, one event per merge call.
    NewAlerts(Vec<Alert>),
    /// Push channel (re)connected.
    Connected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Needs an operator now.
    High,
    /// Informational toast.
    Low,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub body: String,
}

/// Where notifications end up. Implementations must not block.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notification: Notification);
}

/// Default sink: the operator log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::High => warn!("🚨 {}: {}", notification.title, notification.body),
            NotificationLevel::Low => info!("🔔 {}: {}", notification.title, notification.body),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct NotificationPolicy {
    pub notify_critical: bool,
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self { notify_critical: true }
    }
}

/// Only critical detections are worth interrupting someone for.
pub fn alert_notification(alert: &Alert, policy: &NotificationPolicy) -> Option<Notification> {
    if alert.severity != Severity::Critical || !policy.notify_critical {
        return None;
    }
    let location = if alert.zone.is_empty() {
        alert.camera.clone()
    } else {
        format!("{} • {}", alert.zone, alert.camera)
    };
    Some(Notification {
        level: NotificationLevel::High,
        title: alert.event.clone(),
        body: location,
    })
}

pub fn notifications_for(event: &NotifyEvent, policy: &NotificationPolicy) -> Vec<Notification> {
    match event {
        NotifyEvent::NewAlerts(alerts) => alerts
            .iter()
            .filter_map(|alert| alert_notification(alert, policy))
            .collect(),
        NotifyEvent::Connected => vec![Notification {
            level: NotificationLevel::Low,
            title: "Live alerts".into(),
            body: "Connected to alert stream".into(),
        }],
    }
}

pub fn spawn_notification_processor(
    mut rx: mpsc::Receiver<NotifyEvent>,
    notifier: Arc<dyn Notifier>,
    policy: NotificationPolicy,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    info!("Core: Notification processor started");

    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    for notification in notifications_for(&event, &policy) {
                        notifier.notify(notification);
                    }
                }
                _ = cancel_token.cancelled() => break,
            }
        }
        info!("Core: Notification processor stopped");
    })
}
