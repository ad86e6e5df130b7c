//! Due-date evaluation.
//!
//! Pure functions deciding whether a plan fires on a given day. Evaluation is
//! total: a payload that cannot be interpreted makes the plan "not due" rather
//! than failing the digest.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveTime, TimeZone};

use crate::error::RecurrenceError;
use crate::plans::model::{Period, Plan};

/// Whether `plan` should fire on `today`.
///
/// Recurrence parse failures are logged and treated as not due.
pub fn is_due(plan: &Plan, today: NaiveDate) -> bool {
    match evaluate(plan, today) {
        Ok(due) => due,
        Err(e) => {
            tracing::warn!(plan_id = plan.id, period = %plan.period, "Plan never due: {e}");
            false
        }
    }
}

/// Like [`is_due`], but surfaces why a plan's payload could not be read.
pub fn evaluate(plan: &Plan, today: NaiveDate) -> Result<bool, RecurrenceError> {
    // Never fire twice on the same day.
    if plan.last_sent == Some(today) {
        return Ok(false);
    }

    match &plan.period {
        Period::EveryNDays => {
            let Some(last_sent) = plan.last_sent else {
                return Ok(true);
            };
            let interval: u32 = plan
                .period_value
                .parse()
                .map_err(|_| RecurrenceError::InvalidDayCount(plan.period_value.clone()))?;
            Ok(days_elapsed(today, last_sent) >= i64::from(interval))
        }
        Period::WeeklyOnDays => {
            let weekday = today.weekday().number_from_monday();
            Ok(plan.period_value.contains(&weekday.to_string()))
        }
        Period::Once => {
            let date = parse_once_date(&plan.period_value)?;
            Ok(date == today)
        }
        Period::Unknown(code) => Err(RecurrenceError::UnknownPeriod(code.clone())),
    }
}

/// Whole days between two dates, measured as floor(hours / 24) between their
/// local midnights. Across a DST change the span is 23 or 25 hours per day.
fn days_elapsed(today: NaiveDate, last_sent: NaiveDate) -> i64 {
    let hours = match (local_midnight(today), local_midnight(last_sent)) {
        (Some(now), Some(then)) => now.signed_duration_since(then).num_hours(),
        _ => today.signed_duration_since(last_sent).num_days() * 24,
    };
    hours.div_euclid(24)
}

fn local_midnight(date: NaiveDate) -> Option<DateTime<Local>> {
    Local
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
}

/// Parse a one-off date in strict `DD/MM/YYYY` form.
fn parse_once_date(value: &str) -> Result<NaiveDate, RecurrenceError> {
    let invalid = || RecurrenceError::InvalidDate(value.to_string());
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[2] == b'/'
        && bytes[5] == b'/'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 2 || i == 5 || b.is_ascii_digit());
    if !shaped {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(value, "%d/%m/%Y").map_err(|_| invalid())
}
