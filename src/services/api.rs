use crate::domain::records::{CheckIn, Goal, KeyResult, Member};
use crate::time_utils::{format_reference_date, from_unix_seconds};
use chrono::NaiveDateTime;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const ACCOUNT_BASE_URL: &str = "https://account.base.vn/extapi/v1";
const GOAL_BASE_URL: &str = "https://goal.base.vn/extapi/v1";

const MAX_KR_PAGES: u32 = 50;
const MAX_CHECKIN_PAGES: u32 = 100;
const CHECKIN_PAGE_SIZE: usize = 20;

/// Directory members whose job title contains one of these are out of scope
/// for the report.
const EXCLUDED_TITLE_KEYWORDS: &[&str] = &[
    "kcs",
    "agile",
    "khu vực",
    "sa ti co",
    "trainer",
    "specialist",
    "no",
    "chuyên gia",
    "xnk",
    "vat",
    "trưởng phòng thị trường",
];
const EXCLUDED_USERNAMES: &[&str] = &["ThuAn"];

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("could not build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("unexpected response shape from {0}")]
    Shape(String),
}

#[derive(Debug, Clone)]
pub struct AccountUser {
    pub id: String,
    pub name: String,
    pub username: String,
}

/// A quarterly OKR cycle as listed by the goal API.
#[derive(Debug, Clone)]
pub struct Cycle {
    pub name: String,
    pub path: String,
    pub start_time: NaiveDateTime,
    pub formatted_start_time: String,
}

/// Client for the goal and account APIs. Both sides use form-POST with an
/// access token; list endpoints paginate.
pub struct BaseApiClient {
    http: reqwest::Client,
    goal_token: String,
    account_token: String,
}

impl BaseApiClient {
    pub fn new(goal_token: String, account_token: String) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self {
            http,
            goal_token,
            account_token,
        })
    }

    async fn post(&self, url: &str, form: &[(&str, &str)]) -> Result<Value, ApiError> {
        let wrap = |source: reqwest::Error| ApiError::Request {
            url: url.to_string(),
            source,
        };
        let response = self
            .http
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(wrap)?
            .error_for_status()
            .map_err(wrap)?;
        response.json().await.map_err(wrap)
    }

    pub async fn get_account_users(&self) -> Result<Vec<AccountUser>, ApiError> {
        let url = format!("{ACCOUNT_BASE_URL}/users");
        let value = self
            .post(&url, &[("access_token", &self.account_token)])
            .await?;
        Ok(parse_account_users(&unwrap_payload(value)))
    }

    pub async fn get_filtered_members(&self, group_path: &str) -> Result<Vec<Member>, ApiError> {
        let url = format!("{ACCOUNT_BASE_URL}/group/get");
        let value = self
            .post(
                &url,
                &[("access_token", &self.account_token), ("path", group_path)],
            )
            .await?;
        Ok(parse_filtered_members(&value))
    }

    /// Quarterly cycles, newest first.
    pub async fn get_cycle_list(&self) -> Result<Vec<Cycle>, ApiError> {
        let url = format!("{GOAL_BASE_URL}/cycle/list");
        let value = self
            .post(&url, &[("access_token", &self.goal_token)])
            .await?;
        Ok(parse_cycles(&value))
    }

    pub async fn get_goals(&self, cycle_path: &str) -> Result<Vec<Goal>, ApiError> {
        let url = format!("{GOAL_BASE_URL}/cycle/get.full");
        let value = self
            .post(
                &url,
                &[("access_token", &self.goal_token), ("path", cycle_path)],
            )
            .await?;
        Ok(parse_goals(&value))
    }

    pub async fn get_krs(&self, cycle_path: &str) -> Result<Vec<KeyResult>, ApiError> {
        let url = format!("{GOAL_BASE_URL}/cycle/krs");
        let mut all = Vec::new();
        for page in 1..=MAX_KR_PAGES {
            let page_str = page.to_string();
            let value = self
                .post(
                    &url,
                    &[
                        ("access_token", &self.goal_token),
                        ("path", cycle_path),
                        ("page", &page_str),
                    ],
                )
                .await?;
            let krs = parse_krs_page(&unwrap_payload(value));
            if krs.is_empty() {
                break;
            }
            tracing::debug!(page, count = krs.len(), "loaded KR page");
            all.extend(krs);
        }
        Ok(all)
    }

    pub async fn get_checkins(&self, cycle_path: &str) -> Result<Vec<CheckIn>, ApiError> {
        let url = format!("{GOAL_BASE_URL}/cycle/checkins");
        let mut all = Vec::new();
        for page in 1..=MAX_CHECKIN_PAGES {
            let page_str = page.to_string();
            let value = self
                .post(
                    &url,
                    &[
                        ("access_token", &self.goal_token),
                        ("path", cycle_path),
                        ("page", &page_str),
                    ],
                )
                .await?;
            let checkins = parse_checkins_page(&unwrap_payload(value));
            if checkins.is_empty() {
                break;
            }
            let short_page = checkins.len() < CHECKIN_PAGE_SIZE;
            tracing::debug!(page, count = checkins.len(), "loaded check-in page");
            all.extend(checkins);
            if short_page {
                break;
            }
        }
        Ok(all)
    }
}

/// Some endpoints wrap the payload object in a one-element array.
fn unwrap_payload(value: Value) -> Value {
    match value {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        other => other,
    }
}

fn text(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Ids arrive as either JSON strings or numbers.
fn id_text(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Numeric coercion with a zero fallback: malformed values must not drop the
/// row, they flatten to 0.
fn numeric(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn timestamp(value: Option<&Value>) -> Option<NaiveDateTime> {
    let seconds = match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };
    from_unix_seconds(seconds)
}

pub fn parse_account_users(value: &Value) -> Vec<AccountUser> {
    value
        .get("users")
        .and_then(|v| v.as_array())
        .map(|users| {
            users
                .iter()
                .map(|user| AccountUser {
                    id: id_text(user, "id"),
                    name: text(user, "name"),
                    username: text(user, "username"),
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn parse_filtered_members(value: &Value) -> Vec<Member> {
    let members = value
        .get("group")
        .and_then(|g| g.get("members"))
        .and_then(|v| v.as_array());
    let Some(members) = members else {
        return Vec::new();
    };

    members
        .iter()
        .map(|m| Member {
            id: id_text(m, "id"),
            name: text(m, "name"),
            username: text(m, "username"),
            job: text(m, "title"),
            email: text(m, "email"),
        })
        .filter(|member| {
            let job = member.job.to_lowercase();
            !EXCLUDED_TITLE_KEYWORDS.iter().any(|kw| job.contains(*kw))
                && !EXCLUDED_USERNAMES.contains(&member.username.as_str())
        })
        .collect()
}

pub fn parse_cycles(value: &Value) -> Vec<Cycle> {
    let cycles = value.get("cycles").and_then(|v| v.as_array());
    let Some(cycles) = cycles else {
        return Vec::new();
    };

    let mut quarterly: Vec<Cycle> = cycles
        .iter()
        .filter(|cycle| text(cycle, "metatype") == "quarterly")
        .filter_map(|cycle| {
            let start_time = timestamp(cycle.get("start_time"))?;
            Some(Cycle {
                name: text(cycle, "name"),
                path: text(cycle, "path"),
                start_time,
                formatted_start_time: format_reference_date(start_time),
            })
        })
        .collect();
    quarterly.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    quarterly
}

pub fn parse_goals(value: &Value) -> Vec<Goal> {
    value
        .get("goals")
        .and_then(|v| v.as_array())
        .map(|goals| {
            goals
                .iter()
                .map(|goal| Goal {
                    id: id_text(goal, "id"),
                    name: goal
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or("Unknown Goal")
                        .to_string(),
                    content: text(goal, "content"),
                    since: timestamp(goal.get("since")),
                    current_value: numeric(goal.get("current_value")),
                    user_id: id_text(goal, "user_id"),
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn parse_krs_page(value: &Value) -> Vec<KeyResult> {
    value
        .get("krs")
        .and_then(|v| v.as_array())
        .map(|krs| {
            krs.iter()
                .map(|kr| KeyResult {
                    id: id_text(kr, "id"),
                    name: kr
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or("Unknown KR")
                        .to_string(),
                    content: text(kr, "content"),
                    since: timestamp(kr.get("since")),
                    current_value: numeric(kr.get("current_value")),
                    user_id: id_text(kr, "user_id"),
                    goal_id: id_text(kr, "goal_id"),
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn parse_checkins_page(value: &Value) -> Vec<CheckIn> {
    value
        .get("checkins")
        .and_then(|v| v.as_array())
        .map(|checkins| checkins.iter().map(parse_checkin).collect())
        .unwrap_or_default()
}

/// The KR reference lives in the embedded `obj_export` object; the "next
/// steps" note is the first form field, when present.
fn parse_checkin(checkin: &Value) -> CheckIn {
    let kr_id = checkin
        .get("obj_export")
        .map(|obj| id_text(obj, "id"))
        .unwrap_or_default();
    let next_steps = checkin
        .get("form")
        .and_then(|v| v.as_array())
        .and_then(|fields| fields.first())
        .map(|field| text(field, "value"))
        .unwrap_or_default();

    CheckIn {
        id: id_text(checkin, "id"),
        name: text(checkin, "name"),
        since: timestamp(checkin.get("since")),
        value: numeric(checkin.get("current_value")),
        kr_id,
        user_id: id_text(checkin, "user_id"),
        next_steps,
    }
}
