use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use shiftlog_core::types::{UserSettings, WorkLog};

use crate::transition::live_seconds;

/// Earnings for `seconds` of work at `hourly_rate`.
pub fn calculate_earnings(seconds: i64, hourly_rate: f64) -> f64 {
    (seconds as f64 / 3600.0) * hourly_rate
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub total_seconds: i64,
    pub earnings: f64,
    pub log_count: usize,
}

/// Aggregated time and earnings over a set of logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarningsSummary {
    pub currency: String,
    pub hourly_rate: f64,
    pub total_seconds: i64,
    pub earnings: f64,
    /// Oldest day first, keyed by the UTC date of each log's `start_time`.
    pub days: Vec<DaySummary>,
}

/// Sum logs into per-day and overall totals.
///
/// Each log is priced at its own rate snapshot; logs without one fall back
/// to the current rate. A running log counts up to `now`.
pub fn summarize(logs: &[WorkLog], settings: &UserSettings, now: DateTime<Utc>) -> EarningsSummary {
    let mut days: BTreeMap<NaiveDate, DaySummary> = BTreeMap::new();

    for log in logs {
        let secs = live_seconds(log, now);
        let rate = log.hourly_rate_at_time.unwrap_or(settings.hourly_rate);
        let date = log.start_time.date_naive();
        let day = days.entry(date).or_insert_with(|| DaySummary {
            date,
            total_seconds: 0,
            earnings: 0.0,
            log_count: 0,
        });
        day.total_seconds = day.total_seconds.saturating_add(secs);
        day.earnings += calculate_earnings(secs, rate);
        day.log_count += 1;
    }

    let days: Vec<DaySummary> = days.into_values().collect();
    EarningsSummary {
        currency: settings.currency.clone(),
        hourly_rate: settings.hourly_rate,
        total_seconds: days
            .iter()
            .fold(0i64, |acc, d| acc.saturating_add(d.total_seconds)),
        earnings: days.iter().map(|d| d.earnings).sum(),
        days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn log(id: i64, start: DateTime<Utc>, secs: i64, rate: Option<f64>, ended: bool) -> WorkLog {
        WorkLog {
            id,
            user_id: "u".into(),
            start_time: start,
            pause_time: None,
            end_time: ended.then_some(start + Duration::seconds(secs)),
            total_seconds: if ended { secs } else { 0 },
            hourly_rate_at_time: rate,
            description: None,
            created_at: start,
        }
    }

    #[test]
    fn earnings_are_prorated_by_hour() {
        assert_eq!(calculate_earnings(5400, 20.0), 30.0);
        assert_eq!(calculate_earnings(0, 99.0), 0.0);
    }

    #[test]
    fn days_group_and_price_by_snapshot() {
        let mon = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap();
        let tue = mon + Duration::days(1);
        let logs = vec![
            log(1, mon, 3600, Some(20.0), true),
            log(2, mon + Duration::hours(3), 1800, None, true),
            log(3, tue, 7200, Some(15.0), true),
        ];
        let settings = UserSettings {
            currency: "EUR".into(),
            hourly_rate: 10.0,
        };
        let s = summarize(&logs, &settings, tue + Duration::hours(8));
        assert_eq!(s.currency, "EUR");
        assert_eq!(s.total_seconds, 3600 + 1800 + 7200);
        assert_eq!(s.days.len(), 2);
        assert_eq!(s.days[0].date, mon.date_naive());
        assert_eq!(s.days[0].log_count, 2);
        assert_eq!(s.days[0].earnings, 20.0 + 5.0);
        assert_eq!(s.earnings, 25.0 + 30.0);
    }

    #[test]
    fn huge_totals_saturate_instead_of_overflowing() {
        let mon = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap();
        let mut huge = log(1, mon, 0, Some(0.0), true);
        huge.total_seconds = i64::MAX;
        let logs = vec![
            huge,
            log(2, mon + Duration::hours(1), 60, Some(0.0), true),
            log(3, mon + Duration::days(1), 60, Some(0.0), true),
        ];
        let s = summarize(&logs, &UserSettings::default(), mon + Duration::days(2));
        assert_eq!(s.days[0].total_seconds, i64::MAX);
        assert_eq!(s.total_seconds, i64::MAX);
    }

    #[test]
    fn running_log_counts_until_now() {
        let start = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap();
        let logs = vec![log(1, start, 0, Some(36.0), false)];
        let s = summarize(&logs, &UserSettings::default(), start + Duration::seconds(1800));
        assert_eq!(s.total_seconds, 1800);
        assert_eq!(s.earnings, 18.0);
    }
}
