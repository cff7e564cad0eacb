use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};

/// Clock frozen at the start of an analysis run. Every reference date is
/// derived from the single captured instant so a run that straddles midnight
/// cannot see inconsistent anchors.
#[derive(Debug, Clone, Copy)]
pub struct ReportClock {
    now: NaiveDateTime,
}

impl ReportClock {
    pub fn start() -> Self {
        Self {
            now: Utc::now().naive_utc(),
        }
    }

    pub fn fixed(now: NaiveDateTime) -> Self {
        Self { now }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    /// Friday of the calendar week before the current one. When today is a
    /// Friday this is exactly seven days back, never today.
    pub fn last_friday(&self) -> NaiveDateTime {
        let offset = self.now.weekday().num_days_from_monday() as i64;
        let monday_current_week = self.now - Duration::days(offset);
        let monday_previous_week = monday_current_week - Duration::days(7);
        monday_previous_week + Duration::days(4)
    }

    /// First day of the current calendar quarter, at midnight.
    pub fn quarter_start(&self) -> NaiveDateTime {
        let quarter = (self.now.month() - 1) / 3 + 1;
        let first_month = (quarter - 1) * 3 + 1;
        NaiveDate::from_ymd_opt(self.now.year(), first_month, 1)
            .expect("first day of a quarter month is a valid date")
            .and_hms_opt(0, 0, 0)
            .expect("midnight is a valid time")
    }

    /// Last instant (23:59:59) of the previous calendar month.
    pub fn last_month_end(&self) -> NaiveDateTime {
        let first_of_current = NaiveDate::from_ymd_opt(self.now.year(), self.now.month(), 1)
            .expect("first day of a month is a valid date");
        (first_of_current - Duration::days(1))
            .and_hms_opt(23, 59, 59)
            .expect("end of day is a valid time")
    }

    /// Monthly shift is meaningless in the opening month of a quarter: the
    /// previous month belongs to the previous cycle.
    pub fn should_compute_monthly_shift(&self) -> bool {
        !matches!(self.now.month(), 1 | 4 | 7 | 10)
    }

    /// [Monday, Sunday 23:59:59] of the previous calendar week.
    pub fn previous_week_window(&self) -> (NaiveDateTime, NaiveDateTime) {
        let offset = self.now.weekday().num_days_from_monday() as i64;
        let monday_this_week = self.now - Duration::days(offset);
        let monday_last_week = monday_this_week - Duration::days(7);
        let sunday_last_week = monday_last_week
            + Duration::days(6)
            + Duration::hours(23)
            + Duration::minutes(59)
            + Duration::seconds(59);
        (monday_last_week, sunday_last_week)
    }

    /// Whole weeks elapsed in the current quarter, floored at one so rates
    /// stay finite in the opening days.
    pub fn weeks_in_quarter(&self) -> f64 {
        let days = (self.now - self.quarter_start()).num_days() as f64;
        (days / 7.0).max(1.0)
    }
}

pub fn format_reference_date(date: NaiveDateTime) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Unix seconds to a naive UTC datetime. Zero means "no date" upstream.
pub fn from_unix_seconds(seconds: i64) -> Option<NaiveDateTime> {
    if seconds == 0 {
        return None;
    }
    DateTime::<Utc>::from_timestamp(seconds, 0).map(|dt| dt.naive_utc())
}
