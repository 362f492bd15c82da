use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use log::{info, warn};

use crate::options::ConsoleOptions;

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_FETCH_INTERVAL_S: u64 = 5;
const DEFAULT_REQUEST_TIMEOUT_S: u64 = 3;

pub struct EnvConfig {
    pub backend_url: String,
    pub push_url: String,
    pub fetch_interval: Duration,
    pub request_timeout: Duration,
    pub notify_critical: bool,
    pub options: Option<PathBuf>,
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = lookup("BACKEND_URL")
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let push_url = lookup("PUSH_URL").unwrap_or_else(|| derive_push_url(&backend_url));

        let fetch_interval_s = match lookup("FETCH_INTERVAL_S") {
            Some(raw) => raw.trim().parse::<u64>()
                .with_context(|| format!("FETCH_INTERVAL_S is not a number: {:?}", raw))?,
            None => DEFAULT_FETCH_INTERVAL_S,
        };

        let request_timeout_s = match lookup("REQUEST_TIMEOUT_S") {
            Some(raw) => raw.trim().parse::<u64>()
                .with_context(|| format!("REQUEST_TIMEOUT_S is not a number: {:?}", raw))?,
            None => DEFAULT_REQUEST_TIMEOUT_S,
        };

        let notify_critical = match lookup("NOTIFY_CRITICAL") {
            Some(raw) => parse_flag(&raw)
                .with_context(|| format!("NOTIFY_CRITICAL is not a boolean: {:?}", raw))?,
            None => true,
        };

        Ok(Self {
            backend_url,
            push_url,
            fetch_interval: Duration::from_secs(fetch_interval_s),
            request_timeout: Duration::from_secs(request_timeout_s),
            notify_critical,
            options: lookup("OPTIONS_PATH").map(PathBuf::from),
        })
    }

    /// Values set in the options file win over the environment.
    pub fn with_options(mut self, options: &ConsoleOptions) -> Self {
        if let Some(secs) = options.fetch_interval_s {
            self.fetch_interval = Duration::from_secs(secs);
        }
        if let Some(flag) = options.notify_critical {
            self.notify_critical = flag;
        }
        self
    }

    pub fn validate(self) -> Result<Self> {
        info!("--- Checking env variables ---");
        info!("🔗 Backend URL: {}", self.backend_url);
        info!("📡 Push URL: {}", self.push_url);
        info!("⏱ Fetch interval: {:?}, request timeout: {:?}", self.fetch_interval, self.request_timeout);

        ensure!(
            self.backend_url.starts_with("http://") || self.backend_url.starts_with("https://"),
            "BACKEND_URL must be an http(s) URL, got {:?}",
            self.backend_url
        );
        ensure!(
            self.push_url.starts_with("ws://") || self.push_url.starts_with("wss://"),
            "PUSH_URL must be a ws(s) URL, got {:?}",
            self.push_url
        );
        ensure!(!self.fetch_interval.is_zero(), "Fetch interval must be positive");
        ensure!(!self.request_timeout.is_zero(), "Request timeout must be positive");
        ensure!(
            self.request_timeout < self.fetch_interval,
            "Request timeout ({:?}) must be shorter than the fetch interval ({:?})",
            self.request_timeout,
            self.fetch_interval
        );

        if !self.notify_critical {
            warn!("⚠️ Critical alert notifications are disabled");
        }

        Ok(self)
    }
}

/// `http://host:8000/` → `ws://host:8000/ws`.
pub fn derive_push_url(backend_url: &str) -> String {
    let base = backend_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    ws_base + "/ws"
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
