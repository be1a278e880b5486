use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Timelike, Utc};

/// Canonical text form for persisted instants. Millisecond precision, `Z` suffix,
/// so values sort lexically in chronological order.
pub fn to_rfc3339_millis(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Start of the hour containing `instant`.
pub fn truncate_to_hour(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .with_minute(0)
        .and_then(|dt| dt.with_second(0))
        .and_then(|dt| dt.with_nanosecond(0))
        .unwrap_or(instant)
}

/// Midnight UTC at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

/// Interprets epoch values the way remote payloads send them: milliseconds when the
/// magnitude is large, seconds otherwise.
pub fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    if value.unsigned_abs() >= 100_000_000_000 {
        Utc.timestamp_millis_opt(value).single()
    } else {
        Utc.timestamp_opt(value, 0).single()
    }
}

/// Parses the loose timestamp formats seen in remote payloads: RFC 3339,
/// `YYYYMMDD`, `YYYY-MM-DD`, or a numeric epoch string.
pub fn parse_loose_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(dt) = parse_rfc3339(trimmed) {
        return Some(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(start_of_day(date));
    }
    if trimmed.len() == 8 {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y%m%d") {
            return Some(start_of_day(date));
        }
    }
    trimmed.parse::<i64>().ok().and_then(from_epoch)
}
