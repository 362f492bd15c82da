use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::core::error::DecodeError;
use crate::core::types::{Alert, AlertId, AlertStatus, Severity};

/// Epoch values at or above this are milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e12;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Alert as the backend sends it on `/alerts` and on the push channel.
#[derive(Deserialize, Debug, Clone)]
pub struct RawAlert {
    #[serde(default, deserialize_with = "flexible_id")]
    pub id: Option<String>,
    #[serde(alias = "time")]
    pub timestamp: Value,
    pub camera: String,
    #[serde(default)]
    pub zone: String,
    #[serde(alias = "event_type")]
    pub event: String,
    #[serde(default)]
    pub scenario: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl RawAlert {
    pub fn into_alert(self) -> Result<Alert, DecodeError> {
        let camera = self.camera.trim().to_string();
        if camera.is_empty() {
            return Err(DecodeError::EmptyField("camera"));
        }
        let event = self.event.trim().to_string();
        if event.is_empty() {
            return Err(DecodeError::EmptyField("event"));
        }

        let timestamp = parse_timestamp(&self.timestamp)?;
        let severity = match self.severity.as_deref() {
            Some(raw) => raw.parse::<Severity>()?,
            None => Severity::Info,
        };
        let status = match self.status.as_deref() {
            Some(raw) => raw.parse::<AlertStatus>()?,
            None => AlertStatus::Logged,
        };

        let id = match self.id {
            Some(id) => AlertId::new(id),
            None => AlertId::synthesize(&camera, timestamp, &event),
        };
        let scenario = self
            .scenario
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| event.clone());

        Ok(Alert {
            id,
            timestamp,
            camera,
            zone: self.zone.trim().to_string(),
            event,
            scenario,
            severity,
            status,
            details: self.details,
            confidence: self.confidence,
        })
    }
}

/// Decodes one push-channel message.
pub fn decode_alert(text: &str) -> Result<Alert, DecodeError> {
    let raw: RawAlert = serde_json::from_str(text)?;
    raw.into_alert()
}

/// Result of decoding an alert list. Bad records are counted, not fatal.
#[derive(Debug, Default)]
pub struct AlertBatch {
    pub alerts: Vec<Alert>,
    pub dropped: usize,
}

pub fn decode_alert_list(items: Vec<Value>) -> AlertBatch {
    let mut batch = AlertBatch::default();

    for item in items {
        let decoded = serde_json::from_value::<RawAlert>(item)
            .map_err(DecodeError::from)
            .and_then(RawAlert::into_alert);

        match decoded {
            Ok(alert) => batch.alerts.push(alert),
            Err(e) => {
                warn!("Dropped alert record: {}", e);
                batch.dropped += 1;
            }
        }
    }

    batch
}

/// RFC 3339, naive ISO-8601 (read as UTC), or epoch seconds/millis as a
/// number or numeric string.
pub fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, DecodeError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .and_then(from_epoch)
            .ok_or_else(|| DecodeError::InvalidTimestamp(n.to_string())),
        Value::String(s) => parse_timestamp_str(s.trim()),
        other => Err(DecodeError::InvalidTimestamp(other.to_string())),
    }
}

fn parse_timestamp_str(s: &str) -> Result<DateTime<Utc>, DecodeError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive.and_utc());
        }
    }
    s.parse::<f64>()
        .ok()
        .and_then(from_epoch)
        .ok_or_else(|| DecodeError::InvalidTimestamp(s.to_string()))
}

fn from_epoch(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }
    if value.abs() >= EPOCH_MILLIS_THRESHOLD {
        return DateTime::from_timestamp_millis(value as i64);
    }
    let secs = value.floor();
    let nanos = ((value - secs) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(secs as i64, nanos)
}

/// The backend sends ids as numbers or strings. Blank strings count as missing.
fn flexible_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrInt {
        Str(String),
        Int(i64),
    }

    Ok(match Option::<StringOrInt>::deserialize(deserializer)? {
        None => None,
        Some(StringOrInt::Int(i)) => Some(i.to_string()),
        Some(StringOrInt::Str(s)) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
    })
}
