use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::error::DecodeError;

/// Alert urgency. Ordering follows declaration order: `Info < ... < Critical`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Info,
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl FromStr for Severity {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(DecodeError::UnknownSeverity(s.to_string())),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow position of an alert. Only ever moves forward:
/// `Info < Logged < Review < Resolved`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Info,
    Logged,
    Review,
    Resolved,
}

impl AlertStatus {
    pub const ALL: [AlertStatus; 4] = [
        AlertStatus::Info,
        AlertStatus::Logged,
        AlertStatus::Review,
        AlertStatus::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Info => "info",
            AlertStatus::Logged => "logged",
            AlertStatus::Review => "review",
            AlertStatus::Resolved => "resolved",
        }
    }

    pub fn is_forward_of(self, current: AlertStatus) -> bool {
        self > current
    }
}

impl FromStr for AlertStatus {
    type Err = DecodeError;

    /// Accepts the backend's detector vocabulary as aliases:
    /// `active` is a freshly logged alert, `acknowledged` is under review.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(AlertStatus::Info),
            "logged" | "active" => Ok(AlertStatus::Logged),
            "review" | "acknowledged" => Ok(AlertStatus::Review),
            "resolved" => Ok(AlertStatus::Resolved),
            _ => Err(DecodeError::UnknownStatus(s.to_string())),
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AlertId(String);

impl AlertId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Deterministic identity for records the backend sent without an id.
    pub fn synthesize(camera: &str, timestamp: DateTime<Utc>, event: &str) -> Self {
        Self(format!(
            "{}|{}|{}",
            camera,
            timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            event
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub timestamp: DateTime<Utc>,
    pub camera: String,
    pub zone: String,
    /// Human readable event label, e.g. "Fence Damage Detected".
    pub event: String,
    /// Category key, e.g. "fence_damage".
    pub scenario: String,
    pub severity: Severity,
    pub status: AlertStatus,
    pub details: Option<String>,
    pub confidence: Option<f64>,
}

impl Alert {
    /// True when both records describe the same detection.
    pub fn same_identity(&self, other: &Alert) -> bool {
        self.id == other.id
            && self.timestamp == other.timestamp
            && self.camera == other.camera
            && self.event == other.event
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub total_alerts: u64,
    #[serde(default)]
    pub active_cameras: u64,
    /// Backend uptime in seconds.
    #[serde(default)]
    pub uptime: u64,
}
