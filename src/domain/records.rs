use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub name: String,
    pub content: String,
    pub since: Option<NaiveDateTime>,
    pub current_value: f64,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyResult {
    pub id: String,
    pub name: String,
    pub content: String,
    pub since: Option<NaiveDateTime>,
    pub current_value: f64,
    pub user_id: String,
    pub goal_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: String,
    pub name: String,
    pub since: Option<NaiveDateTime>,
    /// KR value recorded at check-in time.
    pub value: f64,
    pub kr_id: String,
    pub user_id: String,
    pub next_steps: String,
}

/// A member of the tracked directory group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub username: String,
    pub job: String,
    pub email: String,
}

/// One denormalized row of goal ⋈ key result ⋈ check-in. Goals without KRs
/// and KRs without check-ins still appear, with the missing side empty.
#[derive(Debug, Clone, Serialize)]
pub struct JoinedRecord {
    pub goal_id: String,
    pub goal_name: String,
    pub goal_current_value: f64,
    pub goal_user_id: String,
    pub goal_user_name: Option<String>,
    pub goal_since: Option<NaiveDateTime>,
    pub kr_id: Option<String>,
    pub kr_name: String,
    pub kr_current_value: f64,
    pub kr_since: Option<NaiveDateTime>,
    pub checkin_id: Option<String>,
    pub checkin_name: String,
    pub checkin_since: Option<NaiveDateTime>,
    pub checkin_value: f64,
    pub checkin_user_id: Option<String>,
}

impl JoinedRecord {
    /// A row backed by an actual check-in, not a left-join placeholder.
    pub fn has_checkin(&self) -> bool {
        self.checkin_id.is_some() && !self.checkin_name.is_empty()
    }
}

/// In-memory join of one analysis run, indexed once so per-KR and per-user
/// lookups do not re-scan the full table.
pub struct RecordStore {
    rows: Vec<JoinedRecord>,
    checkins_by_kr: HashMap<String, Vec<usize>>,
    rows_by_user: HashMap<String, Vec<usize>>,
    user_order: Vec<String>,
}

impl RecordStore {
    pub fn build(
        goals: &[Goal],
        krs: &[KeyResult],
        checkins: &[CheckIn],
        directory: &HashMap<String, String>,
    ) -> Self {
        let mut krs_by_goal: HashMap<&str, Vec<&KeyResult>> = HashMap::new();
        for kr in krs {
            krs_by_goal.entry(kr.goal_id.as_str()).or_default().push(kr);
        }
        let mut checkins_by_kr_raw: HashMap<&str, Vec<&CheckIn>> = HashMap::new();
        for checkin in checkins {
            checkins_by_kr_raw
                .entry(checkin.kr_id.as_str())
                .or_default()
                .push(checkin);
        }

        let mut rows = Vec::new();
        for goal in goals {
            let user_name = directory.get(&goal.user_id).cloned();
            let goal_krs = krs_by_goal.get(goal.id.as_str());
            match goal_krs {
                None => rows.push(Self::row_without_kr(goal, user_name.clone())),
                Some(goal_krs) => {
                    for kr in goal_krs {
                        let kr_since = kr.since.or(goal.since);
                        match checkins_by_kr_raw.get(kr.id.as_str()) {
                            None => {
                                rows.push(Self::row_without_checkin(goal, kr, kr_since, user_name.clone()))
                            }
                            Some(kr_checkins) => {
                                for checkin in kr_checkins {
                                    rows.push(JoinedRecord {
                                        goal_id: goal.id.clone(),
                                        goal_name: goal.name.clone(),
                                        goal_current_value: goal.current_value,
                                        goal_user_id: goal.user_id.clone(),
                                        goal_user_name: user_name.clone(),
                                        goal_since: goal.since,
                                        kr_id: Some(kr.id.clone()),
                                        kr_name: kr.name.clone(),
                                        kr_current_value: kr.current_value,
                                        kr_since,
                                        checkin_id: Some(checkin.id.clone()),
                                        checkin_name: checkin.name.clone(),
                                        checkin_since: checkin.since.or(kr_since),
                                        checkin_value: checkin.value,
                                        checkin_user_id: Some(checkin.user_id.clone()),
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }

        let mut checkins_by_kr: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, row) in rows.iter().enumerate() {
            if let Some(kr_id) = &row.kr_id {
                if row.has_checkin() && row.checkin_since.is_some() {
                    checkins_by_kr.entry(kr_id.clone()).or_default().push(idx);
                }
            }
        }
        for indices in checkins_by_kr.values_mut() {
            indices.sort_by_key(|&i| rows[i].checkin_since);
        }

        let mut rows_by_user: HashMap<String, Vec<usize>> = HashMap::new();
        let mut user_order = Vec::new();
        for (idx, row) in rows.iter().enumerate() {
            if let Some(name) = &row.goal_user_name {
                if !rows_by_user.contains_key(name) {
                    user_order.push(name.clone());
                }
                rows_by_user.entry(name.clone()).or_default().push(idx);
            }
        }

        Self {
            rows,
            checkins_by_kr,
            rows_by_user,
            user_order,
        }
    }

    fn row_without_kr(goal: &Goal, user_name: Option<String>) -> JoinedRecord {
        JoinedRecord {
            goal_id: goal.id.clone(),
            goal_name: goal.name.clone(),
            goal_current_value: goal.current_value,
            goal_user_id: goal.user_id.clone(),
            goal_user_name: user_name,
            goal_since: goal.since,
            kr_id: None,
            kr_name: String::new(),
            kr_current_value: 0.0,
            kr_since: goal.since,
            checkin_id: None,
            checkin_name: String::new(),
            checkin_since: goal.since,
            checkin_value: 0.0,
            checkin_user_id: None,
        }
    }

    fn row_without_checkin(
        goal: &Goal,
        kr: &KeyResult,
        kr_since: Option<NaiveDateTime>,
        user_name: Option<String>,
    ) -> JoinedRecord {
        JoinedRecord {
            goal_id: goal.id.clone(),
            goal_name: goal.name.clone(),
            goal_current_value: goal.current_value,
            goal_user_id: goal.user_id.clone(),
            goal_user_name: user_name,
            goal_since: goal.since,
            kr_id: Some(kr.id.clone()),
            kr_name: kr.name.clone(),
            kr_current_value: kr.current_value,
            kr_since,
            checkin_id: None,
            checkin_name: String::new(),
            checkin_since: kr_since,
            checkin_value: 0.0,
            checkin_user_id: None,
        }
    }

    pub fn rows(&self) -> &[JoinedRecord] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// User names in first-encounter order; rows for goals whose owner is
    /// missing from the directory carry no user name and are not listed.
    pub fn users(&self) -> &[String] {
        &self.user_order
    }

    pub fn user_rows(&self, user_name: &str) -> Vec<&JoinedRecord> {
        self.rows_by_user
            .get(user_name)
            .map(|indices| indices.iter().map(|&i| &self.rows[i]).collect())
            .unwrap_or_default()
    }

    /// Real check-in rows for a KR, sorted ascending by check-in date.
    pub fn checkins_for_kr(&self, kr_id: &str) -> Vec<&JoinedRecord> {
        self.checkins_by_kr
            .get(kr_id)
            .map(|indices| indices.iter().map(|&i| &self.rows[i]).collect())
            .unwrap_or_default()
    }
}
