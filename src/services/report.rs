use crate::analytics::checkins::OverallCheckinStats;
use crate::analytics::coverage::CoverageReport;
use crate::domain::records::Member;
use crate::domain::shift::UserOkrShift;
use crate::time_utils::{format_reference_date, ReportClock};
use std::fmt::Write;

/// Renders the run into one self-contained HTML document. Consumers only
/// read the computed fields; nothing is recalculated here.
pub fn render_report(
    cycle_name: &str,
    clock: &ReportClock,
    weekly: &[UserOkrShift],
    monthly: &[UserOkrShift],
    overall_checkins: &[OverallCheckinStats],
    coverage: &CoverageReport,
) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>OKR Shift Report</title>\n<style>\n");
    html.push_str(
        "body{font-family:Arial,sans-serif;margin:24px;color:#222}\n\
         table{border-collapse:collapse;width:100%;margin:12px 0}\n\
         th,td{border:1px solid #ccc;padding:6px 10px;text-align:left}\n\
         th{background:#f2f2f2}\n\
         tr.even{background:#fafafa}\n\
         .positive{color:#1a7f37;font-weight:bold}\n\
         .negative{color:#b42318;font-weight:bold}\n\
         .neutral{color:#555}\n",
    );
    html.push_str("</style>\n</head>\n<body>\n");

    let _ = write!(
        html,
        "<h1>OKR Shift Report — {}</h1>\n<p>Generated {}</p>\n",
        escape(cycle_name),
        format_reference_date(clock.now()),
    );

    let _ = write!(
        html,
        "<p>{} users ranked weekly{}; {} without goals, {} with goals but no check-ins.</p>\n",
        weekly.len(),
        if monthly.is_empty() {
            String::new()
        } else {
            format!(", {} monthly", monthly.len())
        },
        coverage.without_goals.len(),
        coverage.with_goals_no_checkins.len(),
    );

    html.push_str("<h2>Weekly OKR shift</h2>\n");
    push_shift_table(&mut html, weekly);

    if !monthly.is_empty() {
        html.push_str("<h2>Monthly OKR shift</h2>\n");
        push_shift_table(&mut html, monthly);
    }

    if !overall_checkins.is_empty() {
        html.push_str("<h2>Check-in activity</h2>\n");
        push_checkin_table(&mut html, overall_checkins);
    }

    push_member_list(&mut html, "Members without goals", &coverage.without_goals);
    push_member_list(
        &mut html,
        "Members with goals but no check-ins",
        &coverage.with_goals_no_checkins,
    );

    html.push_str("</body>\n</html>\n");
    html
}

fn push_shift_table(html: &mut String, shifts: &[UserOkrShift]) {
    if shifts.is_empty() {
        html.push_str("<p>No data for this period.</p>\n");
        return;
    }
    html.push_str(
        "<table>\n<tr><th>#</th><th>User</th><th>Shift</th><th>Current</th>\
         <th>Reference value</th><th>Adjusted</th><th>Reference date</th></tr>\n",
    );
    for (i, shift) in shifts.iter().enumerate() {
        let shift_class = if shift.shift > 0.0 {
            "positive"
        } else if shift.shift < 0.0 {
            "negative"
        } else {
            "neutral"
        };
        let row_class = if i % 2 == 0 { "even" } else { "odd" };
        let _ = write!(
            html,
            "<tr class=\"{row_class}\"><td>{}</td><td>{}</td>\
             <td class=\"{shift_class}\">{:.2}</td><td>{:.2}</td><td>{:.2}</td>\
             <td>{}</td><td>{}</td></tr>\n",
            i + 1,
            escape(&shift.user_name),
            shift.shift,
            shift.current_value,
            shift.reference_value,
            if shift.adjustment_applied { "yes" } else { "no" },
            shift.reference_date,
        );
    }
    html.push_str("</table>\n");
}

fn push_checkin_table(html: &mut String, stats: &[OverallCheckinStats]) {
    html.push_str(
        "<table>\n<tr><th>#</th><th>User</th><th>Check-ins</th><th>KRs</th>\
         <th>Rate %</th><th>Per week</th><th>Last week</th></tr>\n",
    );
    for (i, s) in stats.iter().enumerate() {
        let row_class = if i % 2 == 0 { "even" } else { "odd" };
        let _ = write!(
            html,
            "<tr class=\"{row_class}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td>{:.1}</td><td>{:.2}</td><td>{}</td></tr>\n",
            i + 1,
            escape(&s.user_name),
            s.total_checkins,
            s.total_krs,
            s.checkin_rate,
            s.checkin_frequency_per_week,
            s.last_week_checkins,
        );
    }
    html.push_str("</table>\n");
}

fn push_member_list(html: &mut String, title: &str, members: &[Member]) {
    if members.is_empty() {
        return;
    }
    let _ = write!(html, "<h2>{}</h2>\n<ul>\n", escape(title));
    for member in members {
        let _ = write!(
            html,
            "<li>{} ({}) — {}</li>\n",
            escape(&member.name),
            escape(&member.username),
            escape(&member.job),
        );
    }
    html.push_str("</ul>\n");
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shift::ShiftPeriod;
    use chrono::NaiveDate;

    fn shift(name: &str, value: f64) -> UserOkrShift {
        UserOkrShift {
            user_name: name.to_string(),
            shift: value,
            original_shift: value,
            current_value: 80.0,
            reference_value: 80.0 - value,
            legacy_shift: value,
            adjustment_applied: false,
            kr_details_count: 1,
            reference_date: "24/01/2025".to_string(),
            period: ShiftPeriod::Weekly,
        }
    }

    #[test]
    fn test_report_contains_users_and_escapes_markup() {
        let clock = ReportClock::fixed(
            NaiveDate::from_ymd_opt(2025, 1, 29)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        );
        let coverage = CoverageReport {
            without_goals: vec![],
            without_checkins: vec![],
            with_goals_no_checkins: vec![],
        };
        let html = render_report(
            "Q1 <2025>",
            &clock,
            &[shift("Alice", 30.0), shift("Bob & co", -5.0)],
            &[],
            &[],
            &coverage,
        );

        assert!(html.contains("Alice"));
        assert!(html.contains("Bob &amp; co"));
        assert!(html.contains("Q1 &lt;2025&gt;"));
        assert!(html.contains("class=\"positive\""));
        assert!(html.contains("class=\"negative\""));
        assert!(!html.contains("Monthly OKR shift"));
    }
}
