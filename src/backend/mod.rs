pub(crate) mod client;
pub(crate) mod models;
mod event_listener;

use std::time::Duration;

use anyhow::Result;

pub use client::BackendClient;

pub use event_listener::{spawn_event_listener, PushEvent};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

pub fn init(url: &str, request_timeout: Duration) -> Result<BackendClient> {
    BackendClient::new(url, request_timeout, CONNECT_TIMEOUT.min(request_timeout))
}
