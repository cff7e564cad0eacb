use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftPeriod {
    Weekly,
    Monthly,
}

impl ShiftPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftPeriod::Weekly => "weekly",
            ShiftPeriod::Monthly => "monthly",
        }
    }
}

/// One user's computed OKR shift for a single reference period. Built fresh
/// each run; reporting and export read the fields verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct UserOkrShift {
    pub user_name: String,
    /// Shift after the reconciliation clamp; ranking key.
    pub shift: f64,
    /// Shift as aggregated from (goal, KR) name groups, before any clamp.
    pub original_shift: f64,
    pub current_value: f64,
    /// Aggregate value as of the reference date, as reported. The weekly
    /// path may rewrite this for consistency with the reported shift.
    pub reference_value: f64,
    /// current − historical straight difference, kept for traceability.
    pub legacy_shift: f64,
    pub adjustment_applied: bool,
    pub kr_details_count: usize,
    pub reference_date: String,
    pub period: ShiftPeriod,
}
