//! Pure derivations over the alert set: filtering, ordering and the
//! aggregates behind the dashboard charts.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{Datelike, Timelike, Weekday};

use super::types::{Alert, AlertStatus, Severity};

const ALL_SENTINEL: &str = "all";

pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Either the "all" sentinel or one exact value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector<T> {
    All,
    Only(T),
}

impl<T> Default for Selector<T> {
    fn default() -> Self {
        Selector::All
    }
}

impl<T: PartialEq> Selector<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Selector::All => true,
            Selector::Only(expected) => expected == value,
        }
    }
}

impl<T: FromStr> Selector<T> {
    /// `"all"` (any case) or blank is the sentinel, anything else must parse as `T`.
    pub fn parse(raw: &str) -> Result<Self, T::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_SENTINEL) {
            Ok(Selector::All)
        } else {
            trimmed.parse().map(Selector::Only)
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub zone: Selector<String>,
    pub severity: Selector<Severity>,
    /// Case-insensitive substring of the event label or scenario key.
    pub search_text: String,
}

impl FilterCriteria {
    pub fn matches(&self, alert: &Alert) -> bool {
        self.zone.matches(&alert.zone)
            && self.severity.matches(&alert.severity)
            && matches_search(alert, &self.search_text)
    }
}

fn matches_search(alert: &Alert, search_text: &str) -> bool {
    let needle = search_text.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    alert.event.to_lowercase().contains(&needle) || alert.scenario.to_lowercase().contains(&needle)
}

/// Newest first; equal timestamps fall back to id so output is stable.
pub fn sort_for_display(mut alerts: Vec<Alert>) -> Vec<Alert> {
    alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
    alerts
}

pub fn filter_alerts<'a, I>(alerts: I, criteria: &FilterCriteria) -> Vec<Alert>
where
    I: IntoIterator<Item = &'a Alert>,
{
    let matching = alerts
        .into_iter()
        .filter(|alert| criteria.matches(alert))
        .cloned()
        .collect();
    sort_for_display(matching)
}

/// `(scenario, count)` pairs for the proportional chart, largest first.
pub fn aggregate_by_scenario(alerts: &[Alert]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for alert in alerts {
        *counts.entry(alert.scenario.as_str()).or_default() += 1;
    }

    let mut groups: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(label, count)| (label.to_string(), count))
        .collect();
    groups.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    groups
}

pub fn aggregate_by_weekday(alerts: &[Alert]) -> [(Weekday, usize); 7] {
    let mut buckets = WEEKDAYS.map(|day| (day, 0usize));
    for alert in alerts {
        let idx = alert.timestamp.weekday().num_days_from_monday() as usize;
        buckets[idx].1 += 1;
    }
    buckets
}

/// Counts per UTC hour of day.
pub fn aggregate_by_hour(alerts: &[Alert]) -> [usize; 24] {
    let mut buckets = [0usize; 24];
    for alert in alerts {
        buckets[alert.timestamp.hour() as usize] += 1;
    }
    buckets
}

pub fn severity_breakdown(alerts: &[Alert]) -> Vec<(Severity, usize)> {
    Severity::ALL
        .iter()
        .rev()
        .map(|sev| (*sev, alerts.iter().filter(|a| a.severity == *sev).count()))
        .collect()
}

pub fn status_breakdown(alerts: &[Alert]) -> Vec<(AlertStatus, usize)> {
    AlertStatus::ALL
        .iter()
        .map(|st| (*st, alerts.iter().filter(|a| a.status == *st).count()))
        .collect()
}

/// Distinct zones, sorted; feeds the zone picker.
pub fn known_zones(alerts: &[Alert]) -> Vec<String> {
    let mut zones: Vec<String> = alerts.iter().map(|a| a.zone.clone()).collect();
    zones.sort();
    zones.dedup();
    zones
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{alert, alert_at, scenario_alert};
    use crate::core::types::AlertId;

    fn zone_grid() -> Vec<Alert> {
        vec![
            alert("a-high", "A", Severity::High, AlertStatus::Logged),
            alert("a-crit", "A", Severity::Critical, AlertStatus::Logged),
            alert("b-high", "B", Severity::High, AlertStatus::Review),
            alert("b-crit", "B", Severity::Critical, AlertStatus::Resolved),
        ]
    }

    #[test]
    fn zone_and_severity_combine_with_and() {
        let alerts = zone_grid();
        let criteria = FilterCriteria {
            zone: Selector::Only("A".into()),
            severity: Selector::Only(Severity::Critical),
            search_text: String::new(),
        };

        let filtered = filter_alerts(&alerts, &criteria);
        let ids: Vec<_> = filtered.iter().map(|a| a.id.clone()).collect();
        assert_eq!(ids, vec![AlertId::new("a-crit")]);
    }

    #[test]
    fn sentinel_all_matches_everything() {
        let alerts = zone_grid();
        assert_eq!(filter_alerts(&alerts, &FilterCriteria::default()).len(), 4);

        let only_b = FilterCriteria {
            zone: Selector::Only("B".into()),
            ..Default::default()
        };
        assert_eq!(filter_alerts(&alerts, &only_b).len(), 2);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let alerts = vec![
            scenario_alert("1", "A", Severity::High, "climbing_hazard", "Climbing Hazard"),
            scenario_alert("2", "A", Severity::High, "fence_damage", "Fence Damage Detected"),
        ];
        let criteria = FilterCriteria {
            search_text: "  FENCE dam ".into(),
            ..Default::default()
        };

        let filtered = filter_alerts(&alerts, &criteria);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, AlertId::new("2"));
    }

    #[test]
    fn filter_output_is_exactly_the_matching_set() {
        let zones = ["A", "B", "C"];
        let events = [
            ("fence_damage", "Fence Damage Detected"),
            ("climbing_hazard", "Climbing Hazard"),
            ("uniform_violation", "Uniform Policy Violation"),
        ];
        let mut alerts = Vec::new();
        for (i, zone) in zones.iter().enumerate() {
            for (j, sev) in Severity::ALL.iter().enumerate() {
                let (scenario, event) = events[(i + j) % events.len()];
                alerts.push(scenario_alert(&format!("{i}-{j}"), zone, *sev, scenario, event));
            }
        }

        let zone_choices = [Selector::All, Selector::Only("A".to_string()), Selector::Only("Z".to_string())];
        let severity_choices = [Selector::All, Selector::Only(Severity::High), Selector::Only(Severity::Info)];
        let searches = ["", "hazard", "VIOLATION"];

        for zone in &zone_choices {
            for severity in &severity_choices {
                for search in searches {
                    let criteria = FilterCriteria {
                        zone: zone.clone(),
                        severity: severity.clone(),
                        search_text: search.to_string(),
                    };
                    let filtered = filter_alerts(&alerts, &criteria);

                    assert!(filtered.iter().all(|a| criteria.matches(a)));
                    let expected = alerts.iter().filter(|a| criteria.matches(a)).count();
                    assert_eq!(filtered.len(), expected);

                    let mut ids: Vec<_> = filtered.iter().map(|a| a.id.clone()).collect();
                    ids.sort();
                    ids.dedup();
                    assert_eq!(ids.len(), filtered.len());
                }
            }
        }
    }

    #[test]
    fn scenario_counts_sum_to_input_size() {
        let alerts = vec![
            scenario_alert("1", "A", Severity::Critical, "fence_damage", "Fence Damage Detected"),
            scenario_alert("2", "A", Severity::Critical, "fence_damage", "Fence Damage Detected"),
            scenario_alert("3", "B", Severity::High, "climbing_hazard", "Climbing Hazard"),
        ];

        let groups = aggregate_by_scenario(&alerts);
        assert_eq!(groups, vec![("fence_damage".to_string(), 2), ("climbing_hazard".to_string(), 1)]);
        assert_eq!(groups.iter().map(|(_, n)| n).sum::<usize>(), alerts.len());
        assert!(aggregate_by_scenario(&[]).is_empty());
    }

    #[test]
    fn weekday_and_hour_buckets() {
        // base is Monday 10:00
        let alerts = vec![alert_at("1", 0), alert_at("2", 30), alert_at("3", 24 * 60 + 60)];

        let days = aggregate_by_weekday(&alerts);
        assert_eq!(days[0], (Weekday::Mon, 2));
        assert_eq!(days[1], (Weekday::Tue, 1));
        assert_eq!(days.iter().map(|(_, n)| n).sum::<usize>(), 3);

        let hours = aggregate_by_hour(&alerts);
        assert_eq!(hours[10], 2);
        assert_eq!(hours[11], 1);
    }

    #[test]
    fn breakdowns_cover_every_level() {
        let alerts = zone_grid();

        let by_severity = severity_breakdown(&alerts);
        assert_eq!(by_severity.len(), Severity::ALL.len());
        assert_eq!(by_severity[0], (Severity::Critical, 2));

        let by_status = status_breakdown(&alerts);
        assert_eq!(by_status[1], (AlertStatus::Logged, 2));
        assert_eq!(by_status[3], (AlertStatus::Resolved, 1));
        assert_eq!(known_zones(&alerts), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn selector_parsing() {
        assert_eq!(Selector::<Severity>::parse("ALL").unwrap(), Selector::All);
        assert_eq!(Selector::<Severity>::parse("").unwrap(), Selector::All);
        assert_eq!(
            Selector::<Severity>::parse("critical").unwrap(),
            Selector::Only(Severity::Critical)
        );
        assert!(Selector::<Severity>::parse("loud").is_err());
        assert_eq!(
            Selector::<String>::parse("Outdoor Play Area").unwrap(),
            Selector::Only("Outdoor Play Area".to_string())
        );
    }
}
