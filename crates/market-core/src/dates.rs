use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// US market close, expressed in the exchange's fixed offset.
const MARKET_CLOSE_HOUR: u32 = 16;
const EXCHANGE_UTC_OFFSET_HOURS: i32 = -5;

/// A calendar date, a relative offset from now, or a symbolic marker
/// resolved against the trading calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateSpec {
    On(NaiveDate),
    /// N calendar days before now.
    DaysAgo(i64),
    /// Yesterday, or today once the market-close cutoff has passed,
    /// walked back over weekends.
    MostRecentTradingDay,
    /// Calendar yesterday, walked back over weekends.
    Yesterday,
}

fn exchange_date(now: DateTime<Utc>) -> (NaiveDate, NaiveTime) {
    // -5h is always a valid offset.
    let offset = FixedOffset::east_opt(EXCHANGE_UTC_OFFSET_HOURS * 3600).unwrap();
    let local = now.with_timezone(&offset);
    (local.date_naive(), local.time())
}

fn back_over_weekend(mut date: NaiveDate) -> NaiveDate {
    while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        date -= Duration::days(1);
    }
    date
}

/// The latest day the market has produced a full session for.
pub fn most_recent_trading_day(now: DateTime<Utc>) -> NaiveDate {
    let (date, time) = exchange_date(now);
    let close = NaiveTime::from_hms_opt(MARKET_CLOSE_HOUR, 0, 0).unwrap();
    let candidate = if time >= close { date } else { date - Duration::days(1) };
    back_over_weekend(candidate)
}

/// Resolve a symbolic or relative date against a single reference instant.
///
/// Both ends of a fetch range go through this one function so weekend
/// handling cannot drift between them.
pub fn resolve(spec: DateSpec, now: DateTime<Utc>) -> NaiveDate {
    match spec {
        DateSpec::On(date) => date,
        DateSpec::DaysAgo(days) => exchange_date(now).0 - Duration::days(days),
        DateSpec::MostRecentTradingDay => most_recent_trading_day(now),
        DateSpec::Yesterday => back_over_weekend(exchange_date(now).0 - Duration::days(1)),
    }
}

/// Resolve a (start, end) pair. A collapsed range is widened by one day
/// so the provider never sees an empty interval.
pub fn resolve_range(start: DateSpec, end: DateSpec, now: DateTime<Utc>) -> (NaiveDate, NaiveDate) {
    let start = resolve(start, now);
    let mut end = resolve(end, now);
    if start == end {
        end += Duration::days(1);
    }
    (start, end)
}
