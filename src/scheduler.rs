//! Scheduled sweeps.
//!
//! Expressions use the familiar five-field cron layout; a zero seconds field
//! is prepended for the `cron` crate. Fire times are evaluated in the
//! configured zone (UTC when none is set).

use crate::config::ConfigError;
use crate::reconcile::Reconciler;
use crate::store::RecordStore;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};

pub fn parse_cron(expr: &str) -> Result<Schedule, ConfigError> {
    let fields = expr.split_whitespace().count();
    if fields != 5 {
        return Err(ConfigError::invalid(
            "WEEK_SYNC_CRON",
            expr,
            format!("expected 5 fields, found {fields}"),
        ));
    }
    let full_expr = format!("0 {expr}");
    Schedule::from_str(&full_expr)
        .map_err(|err| ConfigError::invalid("WEEK_SYNC_CRON", expr, err.to_string()))
}

/// First fire time strictly after `after`.
pub fn next_run_after(schedule: &Schedule, tz: Tz, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule
        .after(&after.with_timezone(&tz))
        .next()
        .map(|next| next.with_timezone(&Utc))
}

/// Run a sweep at every fire time, forever. Sweeps never overlap within
/// this loop because each one is awaited before the next sleep.
pub async fn run_scheduled_sweeps<S>(reconciler: Arc<Reconciler<S>>, schedule: Schedule, tz: Tz)
where
    S: RecordStore + 'static,
{
    loop {
        let now = Utc::now();
        let Some(next) = next_run_after(&schedule, tz, now) else {
            error!("cron schedule has no upcoming fire time, scheduled sweeps stopped");
            return;
        };
        info!(next_run = %next.with_timezone(&tz), "next scheduled sweep");

        let wait = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        let summary = reconciler.update_all_boards().await;
        info!(summary = %summary.to_cli_summary(), "scheduled sweep finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn parses_weekday_morning_schedule() {
        assert!(parse_cron("0 6 * * Mon-Fri").is_ok());
        assert!(parse_cron("30 5 * * *").is_ok());
    }

    #[test]
    fn rejects_wrong_field_count_and_garbage() {
        assert!(parse_cron("0 0 6 * * *").is_err());
        assert!(parse_cron("not a cron").is_err());
        assert!(parse_cron("99 6 * * *").is_err());
    }

    #[test]
    fn next_run_is_evaluated_in_the_configured_zone() {
        let schedule = parse_cron("0 6 * * *").unwrap();
        let tz: Tz = "America/New_York".parse().unwrap();
        // 2025-01-08 12:00 UTC is 07:00 in New York, past today's 06:00 run
        let now = Utc.with_ymd_and_hms(2025, 1, 8, 12, 0, 0).unwrap();
        let next = next_run_after(&schedule, tz, now).unwrap();
        let local = next.with_timezone(&tz);
        assert_eq!(local.hour(), 6);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 9, 11, 0, 0).unwrap());
    }
}
