use crate::domain::shift::ShiftPeriod;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciled {
    pub adjusted_shift: f64,
    pub adjustment_applied: bool,
    /// Historical value to report. The weekly path rewrites it so the table
    /// stays internally consistent with the shift it shows; monthly keeps
    /// the measured value as-is.
    pub reported_historical: f64,
}

/// Clamp rule between the two independent shift estimates: when the grouped
/// per-KR aggregation exceeds the user's whole current aggregate, fall back
/// to the direct current − historical difference.
pub fn reconcile(
    period: ShiftPeriod,
    aggregated_shift: f64,
    current_value: f64,
    historical_value: f64,
) -> Reconciled {
    let mut adjusted_shift = aggregated_shift;
    let mut adjustment_applied = false;
    if aggregated_shift > current_value {
        adjusted_shift = current_value - historical_value;
        adjustment_applied = true;
    }

    let mut reported_historical = historical_value;
    if period == ShiftPeriod::Weekly
        && (current_value < historical_value
            || historical_value != current_value - aggregated_shift)
    {
        reported_historical = current_value - aggregated_shift;
    }

    Reconciled {
        adjusted_shift,
        adjustment_applied,
        reported_historical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plausible_shift_passes_through() {
        let r = reconcile(ShiftPeriod::Weekly, 30.0, 80.0, 50.0);
        assert_eq!(r.adjusted_shift, 30.0);
        assert!(!r.adjustment_applied);
        // 50 == 80 - 30, so the historical value is untouched.
        assert_eq!(r.reported_historical, 50.0);
    }

    #[test]
    fn test_shift_above_current_value_is_clamped() {
        let r = reconcile(ShiftPeriod::Monthly, 120.0, 80.0, 50.0);
        assert_eq!(r.adjusted_shift, 30.0);
        assert!(r.adjustment_applied);
    }

    #[test]
    fn test_boundary_is_not_clamped() {
        let r = reconcile(ShiftPeriod::Monthly, 80.0, 80.0, 50.0);
        assert_eq!(r.adjusted_shift, 80.0);
        assert!(!r.adjustment_applied);
    }

    #[test]
    fn test_weekly_rewrites_inconsistent_historical() {
        // 40 != 80 - 30: the reported historical is forced to 50.
        let r = reconcile(ShiftPeriod::Weekly, 30.0, 80.0, 40.0);
        assert_eq!(r.reported_historical, 50.0);

        // current < historical triggers the same rewrite.
        let r = reconcile(ShiftPeriod::Weekly, 10.0, 40.0, 70.0);
        assert_eq!(r.reported_historical, 30.0);
    }

    #[test]
    fn test_monthly_never_rewrites_historical() {
        let r = reconcile(ShiftPeriod::Monthly, 30.0, 80.0, 40.0);
        assert_eq!(r.reported_historical, 40.0);

        let r = reconcile(ShiftPeriod::Monthly, 10.0, 40.0, 70.0);
        assert_eq!(r.reported_historical, 70.0);
    }
}
