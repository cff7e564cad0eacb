use crate::analytics::aggregate::{
    aggregate_value_at, aggregated_user_shift, current_aggregate_value,
};
use crate::domain::records::{CheckIn, KeyResult, RecordStore};
use crate::time_utils::ReportClock;
use chrono::Datelike;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Engagement score for one user, combining check-in discipline, having an
/// OKR at all, and the monthly OKR movement.
#[derive(Debug, Clone, Serialize)]
pub struct UserScore {
    pub user_id: String,
    pub name: String,
    pub has_okr: bool,
    pub checked_in: bool,
    pub movement: f64,
    pub score: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Movement brackets are the upstream product rule, holes included: 25,
/// 30–31, 50–51, 80–81 and 99–100 fall through with no bonus.
fn movement_bonus(movement: f64) -> f64 {
    if movement < 10.0 {
        0.15
    } else if (10.0..25.0).contains(&movement) {
        0.25
    } else if (26.0..30.0).contains(&movement) {
        0.5
    } else if (31.0..50.0).contains(&movement) {
        0.75
    } else if (51.0..80.0).contains(&movement) {
        1.25
    } else if (81.0..99.0).contains(&movement) {
        1.5
    } else if movement >= 100.0 {
        2.5
    } else {
        0.0
    }
}

fn score(has_okr: bool, checked_in: bool, movement: f64) -> f64 {
    let mut score = 0.5;
    if checked_in {
        score += 0.5;
    }
    if has_okr {
        score += 1.0;
    }
    score += movement_bonus(movement);
    round2(score)
}

/// A user counts as checked in when their raw check-ins this quarter span at
/// least three distinct ISO weeks.
fn has_weekly_checkins(user_id: &str, checkins: &[CheckIn], clock: &ReportClock) -> bool {
    let start = clock.quarter_start();
    let end = clock.now().date().and_hms_opt(23, 59, 59).unwrap_or(clock.now());

    let weeks: HashSet<u32> = checkins
        .iter()
        .filter(|c| c.user_id == user_id)
        .filter_map(|c| c.since)
        .filter(|since| *since >= start && *since <= end)
        .map(|since| since.iso_week().week())
        .collect();
    weeks.len() >= 3
}

/// Scores every KR owner found in the account directory. Movement is the
/// clamped monthly shift, except during quarter-opening months where the
/// current aggregate value stands in (there is no previous month to shift
/// from).
pub fn compute_scores(
    store: &RecordStore,
    krs: &[KeyResult],
    checkins: &[CheckIn],
    directory: &HashMap<String, String>,
    clock: &ReportClock,
) -> Vec<UserScore> {
    let mut seen = HashSet::new();
    let mut scores = Vec::new();

    for kr in krs {
        if kr.user_id.is_empty() || !seen.insert(kr.user_id.as_str()) {
            continue;
        }
        let Some(name) = directory.get(&kr.user_id) else {
            continue;
        };

        let movement = user_movement(store, name, clock);
        let checked_in = has_weekly_checkins(&kr.user_id, checkins, clock);
        // Users are built from KRs, so OKR ownership is a given.
        let has_okr = true;

        scores.push(UserScore {
            user_id: kr.user_id.clone(),
            name: name.clone(),
            has_okr,
            checked_in,
            movement,
            score: score(has_okr, checked_in, movement),
        });
    }

    scores
}

fn user_movement(store: &RecordStore, user_name: &str, clock: &ReportClock) -> f64 {
    let user_rows = store.user_rows(user_name);
    let current_value = current_aggregate_value(&user_rows);

    if !clock.should_compute_monthly_shift() {
        return round2(current_value);
    }

    let anchor = clock.last_month_end();
    let monthly_shift =
        aggregated_user_shift(store, &user_rows, anchor, clock.quarter_start());

    if monthly_shift > current_value {
        let (last_month_value, _) = aggregate_value_at(store, &user_rows, anchor);
        round2(current_value - last_month_value)
    } else {
        round2(monthly_shift)
    }
}
