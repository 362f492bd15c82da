use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};

use super::error::StoreError;
use super::notification::NotifyEvent;
use super::types::{Alert, AlertId, AlertStatus, Stats};
use super::view;

/// Result of a single merge call.
#[derive(Debug, Default, Clone)]
pub struct MergeOutcome {
    pub inserted: Vec<Alert>,
    pub status_advanced: usize,
    pub unchanged: usize,
    pub rejected: Vec<AlertId>,
    pub stats_replaced: bool,
    /// Generation after the call.
    pub generation: u64,
}

impl MergeOutcome {
    pub fn changed(&self) -> bool {
        !self.inserted.is_empty() || self.status_advanced > 0 || self.stats_replaced
    }
}

/// Point-in-time copy of the store. Safe to hand to any reader.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub alerts: Vec<Alert>,
    pub stats: Option<Stats>,
    pub generation: u64,
}

#[derive(Default)]
struct StoreState {
    alerts: HashMap<AlertId, Alert>,
    stats: Option<Stats>,
    generation: u64,
    closed: bool,
}

enum Applied {
    Inserted(Alert),
    StatusAdvanced,
    Unchanged,
    Rejected(AlertId),
}

/// Canonical set of known alerts plus the latest stats.
///
/// Every writer goes through one of the merge entry points, each of which
/// takes the write lock for the whole batch, so a snapshot never half-applies.
/// The generation counter moves once per call that changed something and is
/// published on a `watch` channel for subscribers.
pub struct AlertStore {
    state: RwLock<StoreState>,
    changes: watch::Sender<u64>,
    notify_tx: Option<mpsc::Sender<NotifyEvent>>,
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertStore {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            state: RwLock::new(StoreState::default()),
            changes,
            notify_tx: None,
        }
    }

    /// Store that forwards every newly inserted alert to the dispatcher.
    pub fn with_notifier(notify_tx: mpsc::Sender<NotifyEvent>) -> Self {
        Self {
            notify_tx: Some(notify_tx),
            ..Self::new()
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Merges a pulled alert list. Alerts missing from the list are kept.
    pub fn merge_snapshot(&self, alerts: Vec<Alert>) -> Result<MergeOutcome, StoreError> {
        self.merge(None, alerts)
    }

    /// Merges one pushed alert.
    pub fn merge_incremental(&self, alert: Alert) -> Result<MergeOutcome, StoreError> {
        self.merge(None, vec![alert])
    }

    /// Applies a full fetch cycle (stats + alert list) as one mutation.
    pub fn apply_snapshot(&self, stats: Stats, alerts: Vec<Alert>) -> Result<MergeOutcome, StoreError> {
        self.merge(Some(stats), alerts)
    }

    pub fn replace_stats(&self, stats: Stats) -> Result<MergeOutcome, StoreError> {
        self.merge(Some(stats), Vec::new())
    }

    fn merge(&self, stats: Option<Stats>, batch: Vec<Alert>) -> Result<MergeOutcome, StoreError> {
        let mut outcome = MergeOutcome::default();
        {
            let mut state = self.write();
            if state.closed {
                return Err(StoreError::Closed);
            }

            for incoming in batch {
                match apply(&mut state.alerts, incoming) {
                    Applied::Inserted(alert) => outcome.inserted.push(alert),
                    Applied::StatusAdvanced => outcome.status_advanced += 1,
                    Applied::Unchanged => outcome.unchanged += 1,
                    Applied::Rejected(id) => outcome.rejected.push(id),
                }
            }

            if let Some(stats) = stats {
                if state.stats.as_ref() != Some(&stats) {
                    state.stats = Some(stats);
                    outcome.stats_replaced = true;
                }
            }

            if outcome.changed() {
                state.generation += 1;
            }
            outcome.generation = state.generation;
        }

        if outcome.changed() {
            self.changes.send_replace(outcome.generation);
            debug!(
                "Store: generation {} (+{} new, {} advanced, {} rejected)",
                outcome.generation,
                outcome.inserted.len(),
                outcome.status_advanced,
                outcome.rejected.len()
            );
        }
        self.dispatch_inserted(&outcome.inserted);

        Ok(outcome)
    }

    /// Operator-driven status change. Same forward-only rule as reconciliation,
    /// but a regression is reported instead of silently ignored.
    /// Returns `true` when the status actually moved.
    pub fn update_status(&self, id: &AlertId, status: AlertStatus) -> Result<bool, StoreError> {
        let generation = {
            let mut state = self.write();
            if state.closed {
                return Err(StoreError::Closed);
            }

            let alert = state
                .alerts
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;

            if alert.status == status {
                return Ok(false);
            }
            if !status.is_forward_of(alert.status) {
                return Err(StoreError::StatusRegression {
                    id: id.clone(),
                    from: alert.status,
                    to: status,
                });
            }

            alert.status = status;
            state.generation += 1;
            state.generation
        };

        info!("Store: {} moved to {}", id, status);
        self.changes.send_replace(generation);
        Ok(true)
    }

    /// Tears the store down. Every later mutation returns [`StoreError::Closed`].
    pub fn close(&self) {
        self.write().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.read().closed
    }

    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    pub fn len(&self) -> usize {
        self.read().alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &AlertId) -> Option<Alert> {
        self.read().alerts.get(id).cloned()
    }

    pub fn stats(&self) -> Option<Stats> {
        self.read().stats.clone()
    }

    /// Alerts newest first.
    pub fn sorted_alerts(&self) -> Vec<Alert> {
        view::sort_for_display(self.read().alerts.values().cloned().collect())
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.read();
        StoreSnapshot {
            alerts: state.alerts.values().cloned().collect(),
            stats: state.stats.clone(),
            generation: state.generation,
        }
    }

    /// Receiver that wakes whenever the generation moves.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// One event per merge call, so a large snapshot takes a single slot
    /// in the dispatcher's queue.
    fn dispatch_inserted(&self, inserted: &[Alert]) {
        let Some(tx) = &self.notify_tx else { return };
        if inserted.is_empty() {
            return;
        }

        if let Err(e) = tx.try_send(NotifyEvent::NewAlerts(inserted.to_vec())) {
            warn!("Store: notification for {} new alerts dropped: {}", inserted.len(), e);
        }
    }
}

fn apply(alerts: &mut HashMap<AlertId, Alert>, incoming: Alert) -> Applied {
    let mut slot = match alerts.entry(incoming.id.clone()) {
        Entry::Vacant(slot) => {
            slot.insert(incoming.clone());
            return Applied::Inserted(incoming);
        }
        Entry::Occupied(slot) => slot,
    };
    let existing = slot.get_mut();

    if !existing.same_identity(&incoming) {
        warn!(
            "Store: rejected {}: conflicts with stored record ({} @ {} on {} vs {} @ {} on {})",
            incoming.id,
            existing.event,
            existing.timestamp,
            existing.camera,
            incoming.event,
            incoming.timestamp,
            incoming.camera
        );
        return Applied::Rejected(incoming.id);
    }

    if incoming.status.is_forward_of(existing.status) {
        debug!("Store: {} {} -> {}", existing.id, existing.status, incoming.status);
        existing.status = incoming.status;
        Applied::StatusAdvanced
    } else {
        Applied::Unchanged
    }
}
