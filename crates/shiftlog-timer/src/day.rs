use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use shiftlog_core::types::parse_timestamp;

/// A calendar day in UTC, as the inclusive range `[00:00:00.000, 23:59:59.999]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayRange {
    /// Parse a `yyyy-MM-dd` date. Anything else is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.len() != 10 {
            return None;
        }
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
        Some(Self::for_date(date))
    }

    pub fn for_date(date: NaiveDate) -> Self {
        let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
        let end = start + Duration::days(1) - Duration::milliseconds(1);
        Self { date, start, end }
    }

    /// An instant on this day, `hour:00:00.000` UTC.
    pub fn at_hour(&self, hour: u32) -> DateTime<Utc> {
        self.start + Duration::hours(i64::from(hour))
    }
}

/// Parse a listing bound: an RFC 3339 timestamp, or a `yyyy-MM-dd` date that
/// expands to the start of the day (`end = false`) or its last millisecond.
pub fn parse_bound(s: &str, end: bool) -> Option<DateTime<Utc>> {
    if let Some(day) = DayRange::parse(s) {
        return Some(if end { day.end } else { day.start });
    }
    parse_timestamp(s.trim()).ok()
}
