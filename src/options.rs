use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;

use crate::core::types::Severity;
use crate::core::view::{FilterCriteria, Selector};

/// Optional console settings file (`OPTIONS_PATH`).
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ConsoleOptions {
    /// Initial zone filter; `"all"` or a zone name.
    #[serde(default)]
    pub zone: Option<String>,

    /// Initial severity filter; `"all"` or a severity.
    #[serde(default)]
    pub severity: Option<String>,

    #[serde(default)]
    pub search_text: Option<String>,

    /// Accepts `10` or `"10"`.
    #[serde(default, deserialize_with = "flexible_u64")]
    pub fetch_interval_s: Option<u64>,

    /// Accepts `true`, `"true"`, `"off"`, ...
    #[serde(default, deserialize_with = "flexible_bool")]
    pub notify_critical: Option<bool>,
}

impl ConsoleOptions {
    /// Loads and validates the options file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        ensure!(path.exists(), "Options file not found: {:?}", path);

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read options file: {:?}", path))?;

        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let options: ConsoleOptions = serde_json::from_str(content)
            .context("JSON schema mismatch in options file")?;

        ensure!(options.fetch_interval_s != Some(0), "fetch_interval_s must be positive");
        options.initial_criteria()?;

        Ok(options)
    }

    pub fn initial_criteria(&self) -> Result<FilterCriteria> {
        let zone = match self.zone.as_deref() {
            Some(raw) => Selector::<String>::parse(raw)?,
            None => Selector::All,
        };
        let severity = match self.severity.as_deref() {
            Some(raw) => Selector::<Severity>::parse(raw)
                .with_context(|| format!("Invalid severity filter {:?}", raw))?,
            None => Selector::All,
        };

        Ok(FilterCriteria {
            zone,
            severity,
            search_text: self.search_text.clone().unwrap_or_default(),
        })
    }
}

fn flexible_u64<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrInt {
        Str(String),
        Int(u64),
    }

    match Option::<StringOrInt>::deserialize(deserializer)? {
        None => Ok(None),
        Some(StringOrInt::Int(i)) => Ok(Some(i)),
        Some(StringOrInt::Str(s)) => s.trim().parse::<u64>().map(Some).map_err(serde::de::Error::custom),
    }
}

fn flexible_bool<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrBool {
        Bool(bool),
        Str(String),
    }

    match Option::<StringOrBool>::deserialize(deserializer)? {
        None => Ok(None),
        Some(StringOrBool::Bool(b)) => Ok(Some(b)),
        Some(StringOrBool::Str(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            other => Err(serde::de::Error::custom(format!("not a boolean: {}", other))),
        },
    }
}
