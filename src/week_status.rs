use crate::calendar::WeekWindow;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workflow status text that marks an item as finished.
pub const DONE_STATUS: &str = "Done";

/// Categorical "Week Assigned" label. There is no ordering between variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeekStatus {
    Completed,
    NotAssigned,
    ThisWeek,
    NextWeek,
    Future,
    PastDue,
}

impl WeekStatus {
    pub const ALL: [WeekStatus; 6] = [
        WeekStatus::Completed,
        WeekStatus::NotAssigned,
        WeekStatus::ThisWeek,
        WeekStatus::NextWeek,
        WeekStatus::Future,
        WeekStatus::PastDue,
    ];

    /// Display text as it appears in the target status column.
    pub fn label(self) -> &'static str {
        match self {
            WeekStatus::Completed => "Completed",
            WeekStatus::NotAssigned => "Not Assigned",
            WeekStatus::ThisWeek => "This Week",
            WeekStatus::NextWeek => "Next Week",
            WeekStatus::Future => "Future",
            WeekStatus::PastDue => "Past Due",
        }
    }

    pub fn to_label(self) -> StatusLabel {
        StatusLabel::new(self.label())
    }
}

impl fmt::Display for WeekStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownWeekStatus(pub String);

impl fmt::Display for UnknownWeekStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown week status '{}'", self.0)
    }
}

impl std::error::Error for UnknownWeekStatus {}

impl FromStr for WeekStatus {
    type Err = UnknownWeekStatus;

    /// Accepts the display label ("Next Week") or the variant name ("NextWeek").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        WeekStatus::ALL
            .into_iter()
            .find(|status| {
                status.label() == trimmed || format!("{status:?}").eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| UnknownWeekStatus(trimmed.to_string()))
    }
}

/// Value object written to a status column: `{"label": "<text>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLabel {
    pub label: String,
}

impl StatusLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

/// Map label text to its status-column value. Unknown text passes through
/// unchanged.
pub fn format_status_label(text: &str) -> StatusLabel {
    match WeekStatus::from_str(text) {
        Ok(status) => status.to_label(),
        Err(_) => StatusLabel::new(text),
    }
}

/// Classify an item. First matching rule wins:
/// done status, missing deadline, this week, next week, later, earlier.
pub fn classify(
    deadline: Option<NaiveDate>,
    workflow_status: Option<&str>,
    today: NaiveDate,
) -> WeekStatus {
    if workflow_status.is_some_and(|status| status.eq_ignore_ascii_case(DONE_STATUS)) {
        return WeekStatus::Completed;
    }

    let Some(deadline) = deadline else {
        return WeekStatus::NotAssigned;
    };

    let this_week = WeekWindow::containing(today);
    let next_week = this_week.next();

    if this_week.contains(deadline) {
        WeekStatus::ThisWeek
    } else if next_week.contains(deadline) {
        WeekStatus::NextWeek
    } else if deadline > next_week.end() {
        WeekStatus::Future
    } else {
        WeekStatus::PastDue
    }
}

/// A deadline value that is present but cannot be read as a date.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed deadline value '{raw}'")]
pub struct MalformedValue {
    pub raw: String,
}

impl MalformedValue {
    fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

/// Read a raw date column value.
///
/// Accepts the JSON object form (`{"date":"2025-01-06","time":null}`), a JSON
/// string, or bare `YYYY-MM-DD` / RFC 3339 / `YYYY-MM-DD HH:MM:SS` text. Empty
/// values and objects without a date are `Ok(None)`.
pub fn parse_deadline(raw: &str) -> Result<Option<NaiveDate>, MalformedValue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    if trimmed.starts_with('{') || trimmed.starts_with('"') {
        let value: serde_json::Value =
            serde_json::from_str(trimmed).map_err(|_| MalformedValue::new(trimmed))?;
        return parse_deadline_value(&value);
    }
    parse_date_text(trimmed).map(Some)
}

/// Same as [`parse_deadline`] for an already-decoded JSON value, as carried
/// by webhook events.
pub fn parse_deadline_value(value: &serde_json::Value) -> Result<Option<NaiveDate>, MalformedValue> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(text) => parse_deadline(text),
        serde_json::Value::Object(map) => match map.get("date") {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::String(date)) if date.trim().is_empty() => Ok(None),
            Some(serde_json::Value::String(date)) => parse_date_text(date.trim()).map(Some),
            Some(other) => Err(MalformedValue::new(other.to_string())),
        },
        other => Err(MalformedValue::new(other.to_string())),
    }
}

fn parse_date_text(text: &str) -> Result<NaiveDate, MalformedValue> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Ok(datetime.date_naive());
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .map(|datetime| datetime.date())
        .map_err(|_| MalformedValue::new(text))
}
