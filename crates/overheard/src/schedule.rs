//! Best-effort resolution of weekly start expressions.
//!
//! A start expression names a weekday and a 12-hour clock time, e.g.
//! `"Wed 6:00pm"` or `"saturday 10:30AM"`. Resolution always yields the next
//! matching instant relative to the supplied "now"; nothing is cached, so the
//! same expression resolves differently as time moves on.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Datelike, Local, NaiveTime, TimeDelta, TimeZone, Timelike, Weekday};

use crate::error::{RecordError, StartTimeError};

/// Canonical rendering of a start expression, e.g. `"Wed 6:00pm"`.
pub const START_FORMAT: &str = "%a %-I:%M%P";

const CLOCK_FORMAT: &str = "%I:%M%p";

/// A parsed start expression: a weekday plus a clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartSpec {
    pub weekday: Weekday,
    pub time: NaiveTime,
}

impl FromStr for StartSpec {
    type Err = StartTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_start(s)
    }
}

/// Parse `"<Weekday> <h>:<mm><am|pm>"` without resolving it.
pub fn parse_start(expr: &str) -> Result<StartSpec, StartTimeError> {
    let parts: Vec<&str> = expr.split_whitespace().collect();
    let [day, clock] = parts[..] else {
        return Err(StartTimeError::InvalidFormat {
            input: expr.to_string(),
        });
    };

    let time = NaiveTime::parse_from_str(clock, CLOCK_FORMAT).map_err(|_| {
        StartTimeError::InvalidTime {
            input: clock.to_string(),
        }
    })?;

    // chrono accepts full and three-letter names, case-insensitively.
    let weekday = day
        .parse::<Weekday>()
        .map_err(|_| StartTimeError::InvalidWeekday {
            input: day.to_string(),
        })?;

    Ok(StartSpec { weekday, time })
}

/// Next instant at or after the current minute matching `spec`.
///
/// Same weekday with a clock time earlier than now rolls over a full week; a
/// time in the current minute or later today stays today.
pub fn next_occurrence<Tz: TimeZone>(
    spec: StartSpec,
    now: &DateTime<Tz>,
) -> Result<DateTime<Tz>, StartTimeError> {
    let current = now.weekday().num_days_from_sunday();
    let target = spec.weekday.num_days_from_sunday();

    let mut days_to_add = (target + 7 - current) % 7;
    if days_to_add == 0 && (spec.time.hour(), spec.time.minute()) < (now.hour(), now.minute()) {
        days_to_add = 7;
    }

    let date = now.date_naive() + TimeDelta::days(i64::from(days_to_add));
    let naive = date.and_time(spec.time);
    let tz = now.timezone();

    // A wall-clock time skipped by a DST change resolves to the hour after.
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(naive + TimeDelta::hours(1)))
                .earliest()
        })
        .ok_or(StartTimeError::NonexistentLocalTime {
            date,
            time: spec.time,
        })
}

/// Resolve a start expression relative to `now`.
pub fn resolve_start_at<Tz: TimeZone>(
    expr: &str,
    now: &DateTime<Tz>,
) -> Result<DateTime<Tz>, StartTimeError> {
    next_occurrence(parse_start(expr)?, now)
}

/// Resolve a start expression against the local clock at call time.
pub fn resolve_start(expr: &str) -> Result<DateTime<Local>, StartTimeError> {
    resolve_start_at(expr, &Local::now())
}

/// Render an instant back into the canonical start expression.
pub fn format_start<Tz: TimeZone>(instant: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    instant.format(START_FORMAT).to_string()
}

/// Parse a capture length such as `"1h30m"` or `"45m"`.
pub fn parse_duration(input: &str) -> Result<Duration, RecordError> {
    let duration = humantime::parse_duration(input.trim())
        .map_err(|e| RecordError::invalid_duration(input, e.to_string()))?;

    if duration.is_zero() {
        return Err(RecordError::invalid_duration(input, "duration must be positive"));
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    // 2024-01-04 is a Thursday.
    fn thursday_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 4, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_wednesday_evening_from_thursday_is_six_days_out() {
        let now = thursday_noon();
        let resolved = resolve_start_at("Wed 6:00pm", &now).unwrap();

        assert_eq!(resolved, Utc.with_ymd_and_hms(2024, 1, 10, 18, 0, 0).unwrap());
        assert_eq!(resolved.date_naive() - now.date_naive(), TimeDelta::days(6));
    }

    #[test]
    fn test_later_today_stays_today() {
        let resolved = resolve_start_at("Thu 3:15pm", &thursday_noon()).unwrap();
        assert_eq!(resolved, Utc.with_ymd_and_hms(2024, 1, 4, 15, 15, 0).unwrap());
    }

    #[test]
    fn test_earlier_today_rolls_over_a_week() {
        let resolved = resolve_start_at("Thu 11:59am", &thursday_noon()).unwrap();
        assert_eq!(resolved, Utc.with_ymd_and_hms(2024, 1, 11, 11, 59, 0).unwrap());
    }

    #[test]
    fn test_current_minute_stays_today() {
        let now = Utc.with_ymd_and_hms(2024, 1, 4, 12, 0, 42).unwrap();
        let resolved = resolve_start_at("Thursday 12:00pm", &now).unwrap();
        assert_eq!(resolved, Utc.with_ymd_and_hms(2024, 1, 4, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_future_points_within_a_week_resolve_exactly() {
        let now = thursday_noon();
        for hours in 1..(7 * 24) {
            let target = now + TimeDelta::hours(hours);
            let resolved = resolve_start_at(&format_start(&target), &now).unwrap();
            assert_eq!(resolved, target, "offset {hours}h");
        }
    }

    #[test]
    fn test_weekday_names_are_case_insensitive() {
        let now = thursday_noon();
        let expected = Utc.with_ymd_and_hms(2024, 1, 6, 10, 30, 0).unwrap();

        for expr in ["Sat 10:30am", "sat 10:30am", "SATURDAY 10:30AM", "Saturday 10:30Am"] {
            assert_eq!(resolve_start_at(expr, &now).unwrap(), expected, "{expr}");
        }
    }

    #[test]
    fn test_midnight_and_noon() {
        let now = thursday_noon();
        assert_eq!(
            resolve_start_at("Fri 12:00am", &now).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap()
        );
        assert_eq!(
            resolve_start_at("Fri 12:00pm", &now).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_rejects_wrong_token_count() {
        for expr in ["Wed", "Wed 6:00 pm", "", "next Wed 6:00pm"] {
            assert!(
                matches!(parse_start(expr), Err(StartTimeError::InvalidFormat { .. })),
                "{expr:?}"
            );
        }
    }

    #[test]
    fn test_rejects_malformed_clock() {
        for expr in ["Wed 6pm", "Wed 18:00", "Wed 13:00pm", "Wed 6:00", "Wed six:00pm"] {
            assert!(
                matches!(parse_start(expr), Err(StartTimeError::InvalidTime { .. })),
                "{expr:?}"
            );
        }
    }

    #[test]
    fn test_rejects_unknown_weekday() {
        assert!(matches!(
            parse_start("Funday 6:00pm"),
            Err(StartTimeError::InvalidWeekday { input }) if input == "Funday"
        ));
    }

    #[test]
    fn test_canonical_rendering() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 10, 18, 0, 0).unwrap();
        assert_eq!(format_start(&instant), "Wed 6:00pm");

        let instant = Utc.with_ymd_and_hms(2024, 1, 7, 9, 5, 0).unwrap();
        assert_eq!(format_start(&instant), "Sun 9:05am");
    }

    #[test]
    fn test_reresolving_rendered_output_is_stable() {
        let now = thursday_noon();
        for expr in ["Wednesday 6:00PM", "thu 11:00am", "Mon 12:30am"] {
            let first = resolve_start_at(expr, &now).unwrap();
            let second = resolve_start_at(&format_start(&first), &now).unwrap();
            assert_eq!(first, second, "{expr}");
        }
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(90 * 60));
        assert_eq!(parse_duration(" 45m ").unwrap(), Duration::from_secs(45 * 60));
        assert!(parse_duration("0s").is_err());
        assert!(matches!(
            parse_duration("forever"),
            Err(RecordError::InvalidDuration { .. })
        ));
    }
}
