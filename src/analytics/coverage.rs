use crate::domain::records::{Member, RecordStore};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Serialize)]
pub struct CheckinGap {
    #[serde(flatten)]
    pub member: Member,
    pub has_goal: bool,
}

/// Which directory members are missing from the goal/check-in data. Feeds
/// the report's follow-up lists; nothing here affects the shift ranking.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageReport {
    pub without_goals: Vec<Member>,
    pub without_checkins: Vec<CheckinGap>,
    pub with_goals_no_checkins: Vec<Member>,
}

pub fn analyze_coverage(members: &[Member], store: &RecordStore) -> CoverageReport {
    let users_with_goals: HashSet<&str> =
        store.users().iter().map(|name| name.as_str()).collect();

    let id_to_name: HashMap<&str, &str> = members
        .iter()
        .map(|m| (m.id.as_str(), m.name.as_str()))
        .collect();
    let users_with_checkins: HashSet<&str> = store
        .rows()
        .iter()
        .filter_map(|row| row.checkin_user_id.as_deref())
        .filter_map(|user_id| id_to_name.get(user_id).copied())
        .collect();

    let mut without_goals = Vec::new();
    let mut without_checkins = Vec::new();
    let mut with_goals_no_checkins = Vec::new();
    let mut seen = HashSet::new();

    for member in members {
        if !seen.insert(member.name.as_str()) {
            continue;
        }
        let has_goal = users_with_goals.contains(member.name.as_str());
        let has_checkin = users_with_checkins.contains(member.name.as_str());

        if !has_goal {
            without_goals.push(member.clone());
        }
        if !has_checkin {
            without_checkins.push(CheckinGap {
                member: member.clone(),
                has_goal,
            });
        }
        if has_goal && !has_checkin {
            with_goals_no_checkins.push(member.clone());
        }
    }

    CoverageReport {
        without_goals,
        without_checkins,
        with_goals_no_checkins,
    }
}
