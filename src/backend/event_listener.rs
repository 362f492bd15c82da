use futures_util::StreamExt;
use log::{debug, info, warn};
use std::cmp::min;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tokio_util::sync::CancellationToken;

use super::models::decode_alert;
use crate::core::types::Alert;

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
/// A connection that lived this long counts as healthy even if it stayed quiet.
const STABLE_CONNECTION: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub enum PushEvent {
    Connected,
    Alert(Alert),
}

/// Doubling reconnect delay, capped.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    initial: Duration,
    max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(INITIAL_BACKOFF, MAX_BACKOFF)
    }
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { current: initial, initial, max }
    }

    pub fn next_delay(&mut self) -> Duration {
        let sleep_for = self.current;
        self.current = min(self.current.saturating_mul(2), self.max);
        sleep_for
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    /// Delay before reconnecting after an established connection dropped.
    /// Only a connection that carried data or stayed up long enough starts
    /// the schedule over; one that drops right after the handshake keeps
    /// backing off.
    pub fn after_disconnect(&mut self, delivered: bool, uptime: Duration) -> Duration {
        if delivered || uptime >= STABLE_CONNECTION {
            self.reset();
        }
        self.next_delay()
    }
}

pub fn spawn_event_listener(
    ws_url: String,
    cancel_token: CancellationToken,
    tx: mpsc::Sender<PushEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = start_event_listener(ws_url, cancel_token.clone(), tx) => {
                info!("Push listener finished.");
            }
            _ = cancel_token.cancelled() => {
                info!("Push listener cancelled.");
            }
        }
    })
}

async fn start_event_listener(
    ws_url: String,
    cancel_token: CancellationToken,
    tx: mpsc::Sender<PushEvent>,
) {
    let mut backoff = Backoff::default();

    loop {
        if cancel_token.is_cancelled() { return; }

        info!("Connect push channel: {}", ws_url);

        let mut ws_stream = match connect_async(ws_url.as_str()).await {
            Ok((s, _)) => s,
            Err(e) => {
                let sleep_for = backoff.next_delay();
                warn!("Connection to push channel failed: {}. Retrying in {:?}...", e, sleep_for);

                tokio::select! {
                    _ = tokio::time::sleep(sleep_for) => continue,
                    _ = cancel_token.cancelled() => return,
                }
            }
        };

        if tx.send(PushEvent::Connected).await.is_err() {
            return;
        }
        let connected_at = Instant::now();
        let mut delivered = false;

        loop {
            tokio::select! {
                msg = ws_stream.next() => {
                    let Some(Ok(msg)) = msg else { break; };

                    let text = match msg {
                        Message::Text(text) => text,
                        Message::Close(frame) => {
                            info!("Push channel closed by backend: {:?}", frame);
                            break;
                        }
                        _ => {
                            delivered = true;
                            continue;
                        }
                    };
                    delivered = true;

                    if text.trim().is_empty() {
                        debug!("Received empty push frame (heartbeat)");
                        continue;
                    }

                    match decode_alert(text.as_str()) {
                        Ok(alert) => {
                            debug!("Push alert {} ({})", alert.id, alert.event);
                            if tx.send(PushEvent::Alert(alert)).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => {
                            warn!("Dropped push message: {}. Payload: {}", e, text.as_str());
                        }
                    }
                }
                _ = cancel_token.cancelled() => {
                    info!("Close push connection...");
                    return;
                }
            }
        }

        let sleep_for = backoff.after_disconnect(delivered, connected_at.elapsed());
        warn!("Push channel lost. Reconnecting in {:?}...", sleep_for);

        tokio::select! {
            _ = tokio::time::sleep(sleep_for) => {},
            _ = cancel_token.cancelled() => return,
        }
    }
}
