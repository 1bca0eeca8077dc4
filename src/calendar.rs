use chrono::{Datelike, Duration, Local, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Inclusive Monday..=Sunday span of calendar dates.
///
/// Comparisons are date-only, so the end bound covers all of Sunday up to
/// 23:59:59.999 without modelling time-of-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl WeekWindow {
    /// The week containing `date`. Weeks always start on Monday.
    pub fn containing(date: NaiveDate) -> Self {
        let start = Self::monday_of(date);
        Self {
            start,
            end: start + Duration::days(6),
        }
    }

    /// The same span shifted forward exactly seven days.
    pub fn next(&self) -> Self {
        Self {
            start: self.start + Duration::days(7),
            end: self.end + Duration::days(7),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Helper: Monday on or before the given date (Sunday maps back six days)
    fn monday_of(date: NaiveDate) -> NaiveDate {
        date - Duration::days(date.weekday().num_days_from_monday() as i64)
    }
}

/// Source of "today" for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    /// Host local time.
    #[default]
    System,
    /// Wall clock in a specific IANA zone.
    Zoned(Tz),
    /// Pinned date, used by tests and the CLI `today` command.
    Fixed(NaiveDate),
}

impl Clock {
    pub fn for_timezone(timezone: Option<Tz>) -> Self {
        match timezone {
            Some(tz) => Clock::Zoned(tz),
            None => Clock::System,
        }
    }

    pub fn today(&self) -> NaiveDate {
        match self {
            Clock::System => Local::now().date_naive(),
            Clock::Zoned(tz) => Utc::now().with_timezone(tz).date_naive(),
            Clock::Fixed(date) => *date,
        }
    }

    pub fn current_week(&self) -> WeekWindow {
        WeekWindow::containing(self.today())
    }
}
