use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::models::{decode_alert_list, AlertBatch};
use crate::core::types::Stats;

pub struct BackendClient {
    url: String,
    client: Client,
}

impl BackendClient {
    pub fn new(url: &str, timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .context("Failed to build backend HTTP client")?;

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.url, path);
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Backend error {} on {}: {}", status, path, body));
        }

        res.json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))
    }

    pub async fn fetch_stats(&self) -> Result<Stats> {
        self.get_json("/stats").await
    }

    /// The list itself must be JSON; individual bad records are dropped.
    pub async fn fetch_alerts(&self) -> Result<AlertBatch> {
        let items: Vec<Value> = self.get_json("/alerts").await?;
        let batch = decode_alert_list(items);

        if batch.dropped > 0 {
            warn!("Backend: dropped {} malformed alert(s) from /alerts", batch.dropped);
        }
        debug!("Backend: fetched {} alerts", batch.alerts.len());

        Ok(batch)
    }
}
