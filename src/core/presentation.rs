use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::info;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::dashboard::Dashboard;
use super::types::{Alert, AlertStatus, Severity};

/// Rows shown under "Recent Activity".
const RECENT_ROWS: usize = 5;
const TOP_SCENARIOS: usize = 3;

pub struct AlertFormatter;

impl AlertFormatter {
    pub fn severity_icon(severity: Severity) -> &'static str {
        match severity {
            Severity::Critical => "🚨",
            Severity::High => "🔴",
            Severity::Medium => "🟠",
            Severity::Low => "🟡",
            Severity::Info => "🔵",
        }
    }

    pub fn status_label(status: AlertStatus) -> &'static str {
        match status {
            AlertStatus::Info => "Info",
            AlertStatus::Logged => "Logged",
            AlertStatus::Review => "Review",
            AlertStatus::Resolved => "Resolved",
        }
    }

    /// `3725` → `"1h 2m"`.
    pub fn format_uptime(seconds: u64) -> String {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }

    pub fn format_last_update(dt: DateTime<Utc>, now: DateTime<Utc>) -> String {
        let diff = now - dt;
        let seconds = diff.num_seconds();

        if seconds < 60 {
            if seconds < 15 {
                return "just now".to_string();
            }
            let rounded_seconds = (seconds / 15) * 15;
            return format!("{}s ago", rounded_seconds);
        }

        if diff < Duration::hours(1) {
            return format!("{}m ago", diff.num_minutes());
        }

        if dt.date_naive() == now.date_naive() {
            dt.format("%H:%M").to_string()
        } else {
            dt.format("%d %b %H:%M").to_string()
        }
    }

    pub fn alert_line(alert: &Alert, now: DateTime<Utc>) -> String {
        format!(
            "{} {} | {} | {} | {} ({})",
            Self::severity_icon(alert.severity),
            Self::format_last_update(alert.timestamp, now),
            alert.camera,
            alert.event,
            Self::status_label(alert.status),
            alert.zone
        )
    }
}

pub fn render_summary(dashboard: &Dashboard, now: DateTime<Utc>) -> String {
    let mut lines = Vec::new();

    match &dashboard.stats {
        Some(stats) => lines.push(format!(
            "Total alerts: {} • Active cameras: {} • Uptime: {}",
            stats.total_alerts,
            stats.active_cameras,
            AlertFormatter::format_uptime(stats.uptime)
        )),
        None => lines.push("Waiting for backend stats...".to_string()),
    }

    let breakdown: Vec<String> = dashboard
        .by_severity
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(sev, count)| format!("{} {}", AlertFormatter::severity_icon(*sev), count))
        .collect();
    lines.push(format!(
        "Showing {} of {} alerts [{}]",
        dashboard.alerts.len(),
        dashboard.total_known,
        breakdown.join(" ")
    ));

    let statuses: Vec<String> = dashboard
        .by_status
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(status, count)| format!("{} {}", AlertFormatter::status_label(*status), count))
        .collect();
    if !statuses.is_empty() {
        lines.push(format!("Workflow: {}", statuses.join(" • ")));
    }

    if !dashboard.zones.is_empty() {
        lines.push(format!("Zones: {}", dashboard.zones.join(", ")));
    }

    let scenarios: Vec<String> = dashboard
        .by_scenario
        .iter()
        .take(TOP_SCENARIOS)
        .map(|(scenario, count)| format!("{} {}", scenario, count))
        .collect();
    if !scenarios.is_empty() {
        lines.push(format!("Top scenarios: {}", scenarios.join(" • ")));
    }

    let busiest_day = dashboard.by_weekday.iter().filter(|(_, n)| *n > 0).max_by_key(|(_, n)| *n);
    let peak_hour = dashboard.by_hour.iter().enumerate().filter(|(_, n)| **n > 0).max_by_key(|(_, n)| **n);
    if let (Some((day, day_count)), Some((hour, hour_count))) = (busiest_day, peak_hour) {
        lines.push(format!(
            "Busiest day: {} ({}) • Peak hour: {:02}:00 UTC ({})",
            day, day_count, hour, hour_count
        ));
    }

    for alert in dashboard.alerts.iter().take(RECENT_ROWS) {
        lines.push(format!("  {}", AlertFormatter::alert_line(alert, now)));
    }

    lines.join("\n")
}

/// Stand-in renderer: writes every new dashboard to the log.
pub fn spawn_dashboard_logger(
    mut rx: watch::Receiver<Arc<Dashboard>>,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                res = rx.changed() => {
                    if res.is_err() { break; }
                    let dashboard = rx.borrow_and_update().clone();
                    info!("📊 Dashboard (gen {})\n{}", dashboard.generation, render_summary(&dashboard, Utc::now()));
                }
                _ = cancel_token.cancelled() => break,
            }
        }
    })
}
