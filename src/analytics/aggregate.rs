use crate::analytics::historical::{historical_kr_value, latest_checkin_at_or_before};
use crate::domain::records::{JoinedRecord, RecordStore};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Where a KR's point-in-time value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    CheckinBeforeAnchor,
    NoCheckinBeforeAnchor,
}

#[derive(Debug, Clone, Serialize)]
pub struct KrValueDetail {
    pub kr_id: String,
    pub goal_name: String,
    pub kr_value: f64,
    pub checkin_date: Option<NaiveDateTime>,
    pub source: ValueSource,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Current aggregate OKR value: one value per distinct goal name (first
/// occurrence wins), averaged.
pub fn current_aggregate_value(user_rows: &[&JoinedRecord]) -> f64 {
    let mut seen = HashSet::new();
    let mut goal_values = Vec::new();
    for row in user_rows {
        if seen.insert(row.goal_name.as_str()) {
            goal_values.push(row.goal_current_value);
        }
    }
    mean(&goal_values)
}

/// Aggregate OKR value as of `anchor`: per distinct KR the latest check-in
/// value at or before the anchor (0 when there is none), grouped by goal
/// name and averaged, then averaged across goals.
///
/// KRs with no check-in get a synthetic `{goal}_no_checkin_{kr}` group so
/// their zeros are not averaged into siblings that do have values.
pub fn aggregate_value_at(
    store: &RecordStore,
    user_rows: &[&JoinedRecord],
    anchor: NaiveDateTime,
) -> (f64, Vec<KrValueDetail>) {
    let mut seen_krs = HashSet::new();
    let mut groups: HashMap<String, Vec<f64>> = HashMap::new();
    let mut details = Vec::new();

    for row in user_rows {
        let Some(kr_id) = row.kr_id.as_deref() else {
            continue;
        };
        if kr_id.is_empty() || !seen_krs.insert(kr_id.to_string()) {
            continue;
        }
        let goal_name = row.goal_name.clone();
        match latest_checkin_at_or_before(store, kr_id, anchor) {
            Some(latest) => {
                groups
                    .entry(goal_name.clone())
                    .or_default()
                    .push(latest.checkin_value);
                details.push(KrValueDetail {
                    kr_id: kr_id.to_string(),
                    goal_name,
                    kr_value: latest.checkin_value,
                    checkin_date: latest.checkin_since,
                    source: ValueSource::CheckinBeforeAnchor,
                });
            }
            None => {
                groups
                    .entry(format!("{goal_name}_no_checkin_{kr_id}"))
                    .or_default()
                    .push(0.0);
                details.push(KrValueDetail {
                    kr_id: kr_id.to_string(),
                    goal_name,
                    kr_value: 0.0,
                    checkin_date: None,
                    source: ValueSource::NoCheckinBeforeAnchor,
                });
            }
        }
    }

    let goal_values: Vec<f64> = groups.values().map(|vals| mean(vals)).collect();
    (mean(&goal_values), details)
}

/// Aggregated shift for one user: per-row KR shift against the historical
/// value, grouped by the literal (goal name, KR name) pair, averaged within
/// each group and then across groups.
///
/// Grouping is by name, not by id: two KRs sharing the same name pair merge
/// into one group. That matches the upstream product rule.
pub fn aggregated_user_shift(
    store: &RecordStore,
    user_rows: &[&JoinedRecord],
    anchor: NaiveDateTime,
    quarter_start: NaiveDateTime,
) -> f64 {
    let mut groups: HashMap<String, Vec<f64>> = HashMap::new();

    for row in user_rows {
        if row.goal_name.is_empty() || row.kr_name.is_empty() {
            continue;
        }
        let kr_shift = match row.kr_id.as_deref() {
            Some(kr_id) if !kr_id.is_empty() => {
                row.kr_current_value
                    - historical_kr_value(store, kr_id, anchor, Some(quarter_start))
            }
            _ => row.kr_current_value,
        };
        groups
            .entry(format!("{}|{}", row.goal_name, row.kr_name))
            .or_default()
            .push(kr_shift);
    }

    let group_averages: Vec<f64> = groups.values().map(|shifts| mean(shifts)).collect();
    mean(&group_averages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::records::{CheckIn, Goal, KeyResult};
    use chrono::NaiveDate;

    fn dt(m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn goal(id: &str, name: &str, value: f64) -> Goal {
        Goal {
            id: id.to_string(),
            name: name.to_string(),
            content: String::new(),
            since: Some(dt(1, 1)),
            current_value: value,
            user_id: "u1".to_string(),
        }
    }

    fn kr(id: &str, name: &str, goal_id: &str, value: f64) -> KeyResult {
        KeyResult {
            id: id.to_string(),
            name: name.to_string(),
            content: String::new(),
            since: Some(dt(1, 1)),
            current_value: value,
            user_id: "u1".to_string(),
            goal_id: goal_id.to_string(),
        }
    }

    fn checkin(id: &str, kr_id: &str, m: u32, d: u32, value: f64) -> CheckIn {
        CheckIn {
            id: id.to_string(),
            name: format!("update {id}"),
            since: Some(dt(m, d)),
            value,
            kr_id: kr_id.to_string(),
            user_id: "u1".to_string(),
            next_steps: String::new(),
        }
    }

    fn build(goals: Vec<Goal>, krs: Vec<KeyResult>, checkins: Vec<CheckIn>) -> RecordStore {
        let directory =
            std::collections::HashMap::from([("u1".to_string(), "Alice".to_string())]);
        RecordStore::build(&goals, &krs, &checkins, &directory)
    }

    #[test]
    fn test_current_value_averages_unique_goals() {
        let store = build(
            vec![goal("g1", "Sales", 80.0), goal("g2", "Hiring", 40.0)],
            vec![
                kr("k1", "Deals", "g1", 80.0),
                kr("k2", "More deals", "g1", 60.0),
            ],
            vec![],
        );
        let rows = store.user_rows("Alice");
        // g1 appears on two rows but counts once.
        assert_eq!(current_aggregate_value(&rows), 60.0);
    }

    #[test]
    fn test_empty_rows_are_zero() {
        let store = build(vec![], vec![], vec![]);
        let rows = store.user_rows("Alice");
        assert_eq!(current_aggregate_value(&rows), 0.0);
        assert_eq!(aggregate_value_at(&store, &rows, dt(2, 1)).0, 0.0);
        assert_eq!(aggregated_user_shift(&store, &rows, dt(2, 1), dt(1, 1)), 0.0);
    }

    #[test]
    fn test_name_pair_grouping_merges_duplicate_krs() {
        // Two different KR ids with the identical (goal, KR) name pair end
        // up in one group; the third KR is its own group.
        let store = build(
            vec![goal("g1", "Sales", 50.0)],
            vec![
                kr("k1", "Deals", "g1", 30.0),
                kr("k2", "Deals", "g1", 10.0),
                kr("k3", "Calls", "g1", 20.0),
            ],
            vec![],
        );
        let rows = store.user_rows("Alice");
        // No check-ins: each kr_shift equals its current value.
        // Group "Sales|Deals" averages to 20, "Sales|Calls" is 20.
        assert_eq!(aggregated_user_shift(&store, &rows, dt(2, 1), dt(1, 1)), 20.0);
    }

    #[test]
    fn test_rows_without_names_are_skipped() {
        let store = build(
            vec![goal("g1", "Sales", 50.0)],
            vec![kr("k1", "", "g1", 30.0)],
            vec![],
        );
        let rows = store.user_rows("Alice");
        assert_eq!(aggregated_user_shift(&store, &rows, dt(2, 1), dt(1, 1)), 0.0);
    }

    #[test]
    fn test_shift_subtracts_latest_in_quarter_checkin() {
        let store = build(
            vec![goal("g1", "Sales", 80.0)],
            vec![kr("k1", "Deals", "g1", 80.0)],
            vec![
                checkin("c1", "k1", 1, 1, 20.0),
                checkin("c2", "k1", 1, 24, 50.0),
            ],
        );
        let rows = store.user_rows("Alice");
        assert_eq!(aggregated_user_shift(&store, &rows, dt(1, 24), dt(1, 1)), 30.0);
    }

    #[test]
    fn test_value_at_anchor_isolates_unchecked_krs() {
        let store = build(
            vec![goal("g1", "Sales", 80.0)],
            vec![
                kr("k1", "Deals", "g1", 80.0),
                kr("k2", "Calls", "g1", 40.0),
            ],
            vec![checkin("c1", "k1", 1, 10, 60.0)],
        );
        let rows = store.user_rows("Alice");
        let (value, details) = aggregate_value_at(&store, &rows, dt(2, 1));
        // k1 contributes 60 under "Sales"; k2 contributes 0 under its own
        // synthetic key instead of dragging the Sales average down.
        assert_eq!(value, 30.0);
        assert_eq!(details.len(), 2);
        assert!(details
            .iter()
            .any(|d| d.source == ValueSource::NoCheckinBeforeAnchor && d.kr_id == "k2"));
    }

    #[test]
    fn test_value_at_anchor_ignores_future_checkins() {
        let store = build(
            vec![goal("g1", "Sales", 80.0)],
            vec![kr("k1", "Deals", "g1", 80.0)],
            vec![
                checkin("c1", "k1", 1, 10, 60.0),
                checkin("c2", "k1", 2, 10, 75.0),
            ],
        );
        let rows = store.user_rows("Alice");
        let (value, _) = aggregate_value_at(&store, &rows, dt(1, 31));
        assert_eq!(value, 60.0);
    }
}
