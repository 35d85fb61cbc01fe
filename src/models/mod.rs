//! Data models for portal actions, calendar geometry and run bookkeeping

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What an action does once its element is available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Click,
    Input,
}

/// A single declarative UI interaction bound to a CSS locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub kind: ActionKind,
    pub locator: String,
    pub text: Option<String>,
}

impl Action {
    pub fn click(locator: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Click,
            locator: locator.into(),
            text: None,
        }
    }

    pub fn input(locator: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Input,
            locator: locator.into(),
            text: Some(text.into()),
        }
    }
}

/// Row and column of a date inside the portal's month grid.
///
/// `week` is the 1-based grid row. `weekday` is the 1-based column of a
/// Sunday-first week (Sunday is 1, Saturday is 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarPosition {
    pub week: u32,
    pub weekday: u32,
}

impl CalendarPosition {
    /// Computes where `date` lands in the month grid the datepicker renders.
    pub fn for_date(date: NaiveDate) -> Self {
        let first_weekday = i64::from(
            date.with_day(1)
                .expect("every month has a first day")
                .weekday()
                .num_days_from_monday(),
        );

        // The grid starts its weeks on Sunday; a month opening on Sunday
        // contributes no leading row offset.
        let first_weekday = if first_weekday == 6 { -1 } else { first_weekday };

        let week = (i64::from(date.day()) + first_weekday) / 7 + 1;
        let weekday = (date.weekday().num_days_from_monday() + 1) % 7 + 1;

        Self {
            week: week as u32,
            weekday,
        }
    }
}

/// Where a completed portal export must end up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    /// Name prefix the export tool gives the raw download
    pub source_prefix: String,
    /// Final path of the renamed report file
    pub destination: PathBuf,
}

impl DownloadTarget {
    /// Builds the target for one report date: the raw `<name>.xlsx` download
    /// becomes `"<name> (<dd.mm.yy>).xlsx"` next to it.
    pub fn for_report_date(download_dir: &Path, report_name: &str, date: NaiveDate) -> Self {
        Self {
            source_prefix: format!("{report_name}.xlsx"),
            destination: download_dir.join(format!(
                "{report_name} ({}).xlsx",
                date.format("%d.%m.%y")
            )),
        }
    }
}

/// The ordered list of report dates one run must fetch.
///
/// Most runs cover only yesterday. When yesterday falls on the trigger
/// weekday the window stretches back `lookback_days` consecutive days,
/// newest first, so the weekly run refreshes reports revised after the fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingWindow {
    dates: Vec<NaiveDate>,
}

impl ProcessingWindow {
    pub fn for_run(yesterday: NaiveDate, trigger: Weekday, lookback_days: u32) -> Self {
        let dates = if yesterday.weekday() == trigger {
            (0..i64::from(lookback_days.max(1)))
                .map(|back| yesterday - Duration::days(back))
                .collect()
        } else {
            vec![yesterday]
        };

        Self { dates }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }
}

/// A report file produced by a portal run, as recorded in the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedReport {
    pub report_date: NaiveDate,
    pub file_path: String,
    pub fetched_at: DateTime<Utc>,
}

/// Telegram Bot API `sendMessage` payload
#[derive(Debug, Serialize)]
pub struct TelegramMessage {
    pub chat_id: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn mid_march_friday_lands_in_week_three_column_six() {
        let position = CalendarPosition::for_date(date(2024, 3, 15));

        assert_eq!(position.week, 3);
        assert_eq!(position.weekday, 6);
    }

    #[test]
    fn first_day_of_sunday_starting_month_is_top_left() {
        // September 2024 opens on a Sunday.
        let position = CalendarPosition::for_date(date(2024, 9, 1));

        assert_eq!(position.week, 1);
        assert_eq!(position.weekday, 1);
    }

    #[test]
    fn second_sunday_of_a_sunday_starting_month_opens_week_two() {
        let position = CalendarPosition::for_date(date(2024, 9, 8));

        assert_eq!(position.week, 2);
        assert_eq!(position.weekday, 1);
    }

    #[test]
    fn last_day_of_sunday_starting_month() {
        let position = CalendarPosition::for_date(date(2024, 9, 30));

        assert_eq!(position.week, 5);
        assert_eq!(position.weekday, 2);
    }

    #[test]
    fn position_stays_in_grid_bounds_for_every_day_of_the_year() {
        let mut day = date(2024, 1, 1);
        let end = date(2025, 1, 1);

        while day < end {
            let position = CalendarPosition::for_date(day);

            assert!(position.week >= 1, "week underflow on {day}");
            assert!(position.week <= 6, "week overflow on {day}");
            assert!(
                (1..=7).contains(&position.weekday),
                "weekday out of range on {day}"
            );

            day += Duration::days(1);
        }
    }

    #[test]
    fn window_is_just_yesterday_on_ordinary_days() {
        // 2024-03-14 is a Thursday.
        let window = ProcessingWindow::for_run(date(2024, 3, 14), Weekday::Sun, 29);

        assert_eq!(window.dates(), &[date(2024, 3, 14)]);
    }

    #[test]
    fn window_expands_to_descending_lookback_on_the_trigger_weekday() {
        // 2024-03-17 is a Sunday.
        let sunday = date(2024, 3, 17);
        let window = ProcessingWindow::for_run(sunday, Weekday::Sun, 29);

        assert_eq!(window.dates().len(), 29);
        assert_eq!(window.dates()[0], sunday);
        assert_eq!(window.dates()[28], date(2024, 2, 18));
        for pair in window.dates().windows(2) {
            assert_eq!(pair[0] - pair[1], Duration::days(1));
        }
    }

    #[test]
    fn window_is_never_empty() {
        let sunday = date(2024, 3, 17);
        let window = ProcessingWindow::for_run(sunday, Weekday::Sun, 0);

        assert!(!window.dates().is_empty());
    }

    #[test]
    fn download_target_encodes_the_report_date_in_the_file_name() {
        let target =
            DownloadTarget::for_report_date(Path::new("/tmp/reports"), "TurnoverList", date(2024, 3, 15));

        assert_eq!(target.source_prefix, "TurnoverList.xlsx");
        assert_eq!(
            target.destination,
            PathBuf::from("/tmp/reports/TurnoverList (15.03.24).xlsx")
        );
    }
}
