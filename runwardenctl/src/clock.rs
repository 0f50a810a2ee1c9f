//! Reference instant for a pass.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Parse a calendar date given as `YYYY-MM-DD` (or the older `YYYY:MM:DD`).
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y:%m:%d"))
        .map_err(|_| anyhow!("invalid date `{raw}`, expected YYYY-MM-DD"))
}

/// A backfill date runs the pass as of one second past midnight UTC.
pub fn backfill_instant(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::from_hms_opt(0, 0, 1).unwrap_or(NaiveTime::MIN))
        .and_utc()
}

pub fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|instant| instant.with_timezone(&Utc))
        .with_context(|| format!("invalid RFC 3339 timestamp `{raw}`"))
}

/// Accept either an RFC 3339 timestamp or a date (midnight UTC).
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    parse_rfc3339(raw).or_else(|_| {
        parse_date(raw)
            .map(|date| date.and_time(NaiveTime::MIN).and_utc())
            .map_err(|_| {
                anyhow!("invalid instant `{raw}`, expected YYYY-MM-DD or RFC 3339")
            })
    })
}

/// Resolve `now` from the mutually exclusive `--date` / `--now` overrides,
/// falling back to the wall clock.
pub fn resolve_now(date: Option<&str>, now: Option<&str>) -> Result<DateTime<Utc>> {
    match (date, now) {
        (Some(_), Some(_)) => Err(anyhow!("--date and --now are mutually exclusive")),
        (Some(date), None) => Ok(backfill_instant(parse_date(date)?)),
        (None, Some(now)) => parse_rfc3339(now),
        (None, None) => Ok(Utc::now()),
    }
}
