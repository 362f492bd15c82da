use anyhow::{bail, Context, Result};
use std::str::FromStr;

use crate::core::types::{AlertId, AlertStatus, Severity};
use crate::core::view::{FilterCriteria, Selector};
use crate::core::AlertStore;

pub const HELP: &str = "Commands: zone <name|all> • severity <level|all> • search [text] • \
clear • status <alert-id> <logged|review|resolved> • help";

/// One line of operator input.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Zone(Selector<String>),
    Severity(Selector<Severity>),
    Search(String),
    Clear,
    Status(AlertId, AlertStatus),
    Help,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        let command = match word.to_ascii_lowercase().as_str() {
            "zone" => Command::Zone(Selector::<String>::parse(rest)?),
            "severity" => Command::Severity(
                Selector::<Severity>::parse(rest).with_context(|| format!("Invalid severity {:?}", rest))?,
            ),
            "search" => Command::Search(rest.to_string()),
            "clear" => Command::Clear,
            "help" | "?" => Command::Help,
            "status" => {
                let (id, status) = rest
                    .rsplit_once(char::is_whitespace)
                    .context("Usage: status <alert-id> <status>")?;
                let status: AlertStatus = status
                    .parse()
                    .with_context(|| format!("Invalid status {:?}", status))?;
                Command::Status(AlertId::new(id.trim()), status)
            }
            "" => bail!("Empty command"),
            other => bail!("Unknown command {:?}. {}", other, HELP),
        };
        Ok(command)
    }
}

impl Command {
    /// Filter commands rewrite `criteria`; status commands go to the store.
    /// Returns the line to show the operator.
    pub fn apply(self, store: &AlertStore, criteria: &mut FilterCriteria) -> Result<String> {
        let reply = match self {
            Command::Zone(zone) => {
                criteria.zone = zone;
                format!("Zone filter: {}", selector_label(&criteria.zone))
            }
            Command::Severity(severity) => {
                criteria.severity = severity;
                format!("Severity filter: {}", selector_label(&criteria.severity))
            }
            Command::Search(text) => {
                criteria.search_text = text;
                if criteria.search_text.is_empty() {
                    "Search cleared".to_string()
                } else {
                    format!("Searching for {:?}", criteria.search_text)
                }
            }
            Command::Clear => {
                *criteria = FilterCriteria::default();
                "Filters cleared".to_string()
            }
            Command::Status(id, status) => {
                if store.update_status(&id, status)? {
                    format!("Alert {} is now {}", id, status)
                } else {
                    format!("Alert {} is already {}", id, status)
                }
            }
            Command::Help => HELP.to_string(),
        };
        Ok(reply)
    }
}

fn selector_label<T: ToString>(selector: &Selector<T>) -> String {
    match selector {
        Selector::All => "all".to_string(),
        Selector::Only(value) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::StoreError;
    use crate::core::testing::alert;

    #[test]
    fn parses_filter_commands() {
        assert_eq!(
            "zone Outdoor Play Area".parse::<Command>().unwrap(),
            Command::Zone(Selector::Only("Outdoor Play Area".into()))
        );
        assert_eq!("ZONE all".parse::<Command>().unwrap(), Command::Zone(Selector::All));
        assert_eq!(
            "severity critical".parse::<Command>().unwrap(),
            Command::Severity(Selector::Only(Severity::Critical))
        );
        assert_eq!("search".parse::<Command>().unwrap(), Command::Search(String::new()));
        assert_eq!(
            "status 42 acknowledged".parse::<Command>().unwrap(),
            Command::Status(AlertId::new("42"), AlertStatus::Review)
        );

        assert!("severity loud".parse::<Command>().is_err());
        assert!("status 42".parse::<Command>().is_err());
        assert!("reboot".parse::<Command>().is_err());
        assert!("   ".parse::<Command>().is_err());
    }

    #[test]
    fn filter_commands_rewrite_criteria() {
        let store = AlertStore::new();
        let mut criteria = FilterCriteria::default();

        Command::Zone(Selector::Only("B".into())).apply(&store, &mut criteria).unwrap();
        let reply = Command::Severity(Selector::Only(Severity::High))
            .apply(&store, &mut criteria)
            .unwrap();
        assert_eq!(reply, "Severity filter: high");
        assert_eq!(criteria.zone, Selector::Only("B".to_string()));

        Command::Clear.apply(&store, &mut criteria).unwrap();
        assert_eq!(criteria, FilterCriteria::default());
    }

    #[test]
    fn status_command_is_forward_only() {
        let store = AlertStore::new();
        let mut criteria = FilterCriteria::default();
        store
            .merge_snapshot(vec![alert("7", "A", Severity::High, AlertStatus::Logged)])
            .unwrap();

        let reply = "status 7 resolved"
            .parse::<Command>()
            .unwrap()
            .apply(&store, &mut criteria)
            .unwrap();
        assert_eq!(reply, "Alert 7 is now resolved");

        let err = Command::Status(AlertId::new("7"), AlertStatus::Review)
            .apply(&store, &mut criteria)
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<StoreError>(), Some(StoreError::StatusRegression { .. })));

        let err = Command::Status(AlertId::new("nope"), AlertStatus::Review)
            .apply(&store, &mut criteria)
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<StoreError>(), Some(StoreError::NotFound(_))));
        assert_eq!(criteria, FilterCriteria::default());
    }
}
