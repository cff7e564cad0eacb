use crate::domain::records::{JoinedRecord, RecordStore};
use crate::time_utils::ReportClock;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashSet;

/// Check-in activity inside the reference period (quarter start up to last
/// Friday).
#[derive(Debug, Clone, Serialize)]
pub struct PeriodCheckinStats {
    pub user_name: String,
    pub checkin_count: usize,
    pub kr_count: usize,
    pub checkin_rate: f64,
    pub first_checkin: Option<NaiveDateTime>,
    pub last_checkin: Option<NaiveDateTime>,
    pub days_between_checkins: i64,
}

/// Check-in activity over the whole cycle.
#[derive(Debug, Clone, Serialize)]
pub struct OverallCheckinStats {
    pub user_name: String,
    pub total_checkins: usize,
    pub total_krs: usize,
    pub checkin_rate: f64,
    pub first_checkin: Option<NaiveDateTime>,
    pub last_checkin: Option<NaiveDateTime>,
    pub days_active: i64,
    pub checkin_frequency_per_week: f64,
    pub last_week_checkins: usize,
    pub weeks_in_quarter: f64,
}

pub fn analyze_checkin_behavior(
    store: &RecordStore,
    clock: &ReportClock,
) -> (Vec<PeriodCheckinStats>, Vec<OverallCheckinStats>) {
    let quarter_start = clock.quarter_start();
    let last_friday = clock.last_friday();

    let mut period_stats = Vec::new();
    let mut overall_stats = Vec::new();

    for user_name in store.users() {
        let user_rows = store.user_rows(user_name);

        let period_rows: Vec<&&JoinedRecord> = user_rows
            .iter()
            .filter(|row| {
                row.checkin_since
                    .is_some_and(|since| since >= quarter_start && since <= last_friday)
            })
            .collect();
        period_stats.push(period_user_stats(user_name, &period_rows));

        overall_stats.push(overall_user_stats(user_name, &user_rows, clock));
    }

    period_stats.sort_by(|a, b| b.checkin_count.cmp(&a.checkin_count));
    overall_stats.sort_by(|a, b| b.total_checkins.cmp(&a.total_checkins));
    (period_stats, overall_stats)
}

fn period_user_stats(user_name: &str, period_rows: &[&&JoinedRecord]) -> PeriodCheckinStats {
    let checkin_count = distinct_checkin_ids(period_rows.iter().copied().copied());
    let kr_count = distinct_kr_ids(period_rows.iter().copied().copied());
    let checkin_rate = rate(checkin_count, kr_count);

    let dates: Vec<NaiveDateTime> = period_rows
        .iter()
        .filter(|row| row.has_checkin())
        .filter_map(|row| row.checkin_since)
        .collect();
    let first_checkin = dates.iter().min().copied();
    let last_checkin = dates.iter().max().copied();
    let days_between_checkins = match (first_checkin, last_checkin) {
        (Some(first), Some(last)) => (last - first).num_days(),
        _ => 0,
    };

    PeriodCheckinStats {
        user_name: user_name.to_string(),
        checkin_count,
        kr_count,
        checkin_rate,
        first_checkin,
        last_checkin,
        days_between_checkins,
    }
}

fn overall_user_stats(
    user_name: &str,
    user_rows: &[&JoinedRecord],
    clock: &ReportClock,
) -> OverallCheckinStats {
    let all_time_rows: Vec<&&JoinedRecord> = user_rows
        .iter()
        .filter(|row| row.checkin_id.is_some())
        .collect();

    // Unlike the period count, overall counts every stored check-in row,
    // named or not.
    let total_checkins = all_time_rows
        .iter()
        .filter_map(|row| row.checkin_id.as_deref())
        .collect::<HashSet<_>>()
        .len();
    let total_krs = distinct_kr_ids(user_rows.iter().copied());
    let checkin_rate = rate(total_checkins, total_krs);

    let dates: Vec<NaiveDateTime> = all_time_rows
        .iter()
        .filter_map(|row| row.checkin_since)
        .collect();
    let first_checkin = dates.iter().min().copied();
    let last_checkin = dates.iter().max().copied();
    let days_active = match (first_checkin, last_checkin) {
        (Some(first), Some(last)) => (last - first).num_days(),
        _ => 0,
    };

    let weeks_in_quarter = clock.weeks_in_quarter();
    let checkin_frequency_per_week = total_checkins as f64 / weeks_in_quarter;

    let (monday_last_week, sunday_last_week) = clock.previous_week_window();
    let last_week_checkins = dates
        .iter()
        .filter(|&&since| since >= monday_last_week && since <= sunday_last_week)
        .count();

    OverallCheckinStats {
        user_name: user_name.to_string(),
        total_checkins,
        total_krs,
        checkin_rate,
        first_checkin,
        last_checkin,
        days_active,
        checkin_frequency_per_week,
        last_week_checkins,
        weeks_in_quarter,
    }
}

fn distinct_checkin_ids<'a>(rows: impl Iterator<Item = &'a JoinedRecord>) -> usize {
    rows.filter(|row| row.has_checkin())
        .filter_map(|row| row.checkin_id.as_deref())
        .collect::<HashSet<_>>()
        .len()
}

fn distinct_kr_ids<'a>(rows: impl Iterator<Item = &'a JoinedRecord>) -> usize {
    rows.filter_map(|row| row.kr_id.as_deref())
        .collect::<HashSet<_>>()
        .len()
}

fn rate(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}
