//! Report window resolution
//!
//! Pure calendar arithmetic: given a report kind and "today", compute the
//! ordered list of dates the report covers and the time span charts must
//! range over. Month and year rollover are handled here and nowhere else.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

/// Kind of periodic report being generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ReportKind {
    /// Covers yesterday only
    Daily,
    /// Covers the 7 days ending yesterday
    Weekly,
    /// Covers the whole previous calendar month
    Monthly,
}

impl ReportKind {
    /// Series smoothing is applied for the longer windows only
    pub fn smooth(&self) -> bool {
        !matches!(self, ReportKind::Daily)
    }

    /// Per-day segments live in year-month subdirectories except for the
    /// daily report, which reads the current rotation directly.
    pub fn dated_subdir(&self) -> bool {
        !matches!(self, ReportKind::Daily)
    }

    /// x-axis tick label format for the plotting engine
    pub fn time_format(&self) -> &'static str {
        match self {
            ReportKind::Daily => "%R",
            ReportKind::Weekly => "%a %d/%m",
            ReportKind::Monthly => "%d",
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportKind::Daily => write!(f, "daily"),
            ReportKind::Weekly => write!(f, "weekly"),
            ReportKind::Monthly => write!(f, "monthly"),
        }
    }
}

/// The set of calendar dates a report covers, resolved once per run
#[derive(Debug, Clone)]
pub struct ReportWindow {
    pub kind: ReportKind,
    /// Ascending; see `resolve` for the per-kind invariants
    pub dates: Vec<NaiveDate>,
}

impl ReportWindow {
    /// Resolve the dates a report must cover.
    ///
    /// - Daily: exactly yesterday.
    /// - Weekly: the 7 consecutive days ending yesterday, ascending.
    /// - Monthly: every day of the month before `today`'s month, with the
    ///   year decremented when `today` is in January.
    pub fn resolve(kind: ReportKind, today: NaiveDate) -> Self {
        let dates = match kind {
            ReportKind::Daily => vec![today - Duration::days(1)],
            ReportKind::Weekly => (1..=7)
                .rev()
                .map(|i| today - Duration::days(i))
                .collect(),
            ReportKind::Monthly => {
                let (year, month) = previous_month(today);
                (1..=days_in_month(year, month))
                    .map(|day| {
                        NaiveDate::from_ymd_opt(year, month, day)
                            .expect("day bounded by month length")
                    })
                    .collect()
            }
        };
        Self { kind, dates }
    }

    /// Chart x-range endpoints as local wall-clock datetimes.
    ///
    /// Daily and weekly span from the first covered day's midnight to the
    /// midnight after the last covered day. Monthly ends at the last day's
    /// midnight, matching the inclusive endpoint the charts have always used.
    pub fn chart_range(&self) -> (NaiveDateTime, NaiveDateTime) {
        let first = *self.dates.first().expect("window never empty");
        let last = *self.dates.last().expect("window never empty");
        let start = first.and_hms_opt(0, 0, 0).expect("midnight is valid");
        let end = match self.kind {
            ReportKind::Monthly => last.and_hms_opt(0, 0, 0).expect("midnight is valid"),
            _ => (last + Duration::days(1))
                .and_hms_opt(0, 0, 0)
                .expect("midnight is valid"),
        };
        (start, end)
    }
}

/// Year and month preceding `today`'s month
fn previous_month(today: NaiveDate) -> (i32, u32) {
    if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    }
}

/// Number of days in the given month
fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .expect("first of month is valid")
        .pred_opt()
        .expect("not the minimum date")
        .day()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_daily_is_yesterday() {
        let window = ReportWindow::resolve(ReportKind::Daily, date(2024, 3, 15));
        assert_eq!(window.dates, vec![date(2024, 3, 14)]);
    }

    #[test]
    fn test_daily_crosses_month_start() {
        let window = ReportWindow::resolve(ReportKind::Daily, date(2024, 3, 1));
        assert_eq!(window.dates, vec![date(2024, 2, 29)]);
    }

    #[test]
    fn test_weekly_seven_consecutive_days_ending_yesterday() {
        let window = ReportWindow::resolve(ReportKind::Weekly, date(2024, 3, 15));
        assert_eq!(window.dates.len(), 7);
        assert_eq!(window.dates[0], date(2024, 3, 8));
        assert_eq!(window.dates[6], date(2024, 3, 14));
        for pair in window.dates.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::days(1));
        }
    }

    #[test]
    fn test_monthly_covers_previous_month() {
        let window = ReportWindow::resolve(ReportKind::Monthly, date(2024, 3, 10));
        assert_eq!(window.dates.len(), 29); // February 2024 is a leap month
        assert_eq!(window.dates[0], date(2024, 2, 1));
        assert_eq!(window.dates[28], date(2024, 2, 29));
    }

    #[test]
    fn test_monthly_january_rolls_back_a_year() {
        let window = ReportWindow::resolve(ReportKind::Monthly, date(2024, 1, 5));
        assert_eq!(window.dates.len(), 31);
        assert_eq!(window.dates[0], date(2023, 12, 1));
        assert_eq!(window.dates[30], date(2023, 12, 31));
    }

    #[test]
    fn test_monthly_day_counts() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
    }

    #[test]
    fn test_daily_chart_range_spans_one_day() {
        let window = ReportWindow::resolve(ReportKind::Daily, date(2024, 3, 15));
        let (start, end) = window.chart_range();
        assert_eq!(start, date(2024, 3, 14).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(end, date(2024, 3, 15).and_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn test_monthly_chart_range_ends_on_last_day_midnight() {
        let window = ReportWindow::resolve(ReportKind::Monthly, date(2024, 3, 10));
        let (start, end) = window.chart_range();
        assert_eq!(start, date(2024, 2, 1).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(end, date(2024, 2, 29).and_hms_opt(0, 0, 0).unwrap());
    }
}
