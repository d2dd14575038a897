use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

use cakeday_core::config::ScheduleConfig;
use cakeday_core::types::parse_timezone;
use cakeday_store::AnniversaryRecord;

/// Which detection path is asking for the due-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    /// Timezone-aware sweep: due when the member's local clock reads the
    /// celebration hour on their anniversary. One sweep per hour serves
    /// every timezone without per-user timers.
    Hourly,
    /// Safety net: due when the server-UTC date matches, timezone ignored.
    Daily,
    /// Startup catch-up: union of daily due-sets for each date since the
    /// last successful tick, bounded by the configured lookback.
    Recovery { since: DateTime<Utc> },
}

/// Compute who is due at `now`, grouped by the calendar date being
/// celebrated. Pure over its inputs — all clock access happens in the
/// caller.
///
/// Paused records never appear in the result, whatever the mode. Year is
/// ignored for recurrence. The leap-day policy shifts Feb 29 anniversaries
/// per [`cakeday_core::LeapDayPolicy`] in every mode alike.
pub fn resolve(
    now: DateTime<Utc>,
    records: &[AnniversaryRecord],
    mode: CheckMode,
    config: &ScheduleConfig,
) -> BTreeMap<chrono::NaiveDate, Vec<String>> {
    let mut due: BTreeMap<chrono::NaiveDate, Vec<String>> = BTreeMap::new();
    let policy = config.leap_day_policy;
    let default_tz = config.default_tz();

    match mode {
        CheckMode::Hourly => {
            for record in records.iter().filter(|r| !r.paused) {
                let tz = parse_timezone(&record.timezone, default_tz);
                let local = now.with_timezone(&tz);
                if local.hour() == config.celebration_hour
                    && record.anniversary.matches(local.date_naive(), policy)
                {
                    due.entry(local.date_naive())
                        .or_default()
                        .push(record.user_id.clone());
                }
            }
        }
        CheckMode::Daily => {
            let today = now.date_naive();
            for record in records.iter().filter(|r| !r.paused) {
                if !record.anniversary.matches(today, policy) {
                    continue;
                }
                // Members with a known timezone belong to the hourly sweep
                // until their local celebration hour has passed; announcing
                // them earlier would also block that sweep via the ledger.
                if !record.timezone.is_empty() {
                    let local =
                        now.with_timezone(&parse_timezone(&record.timezone, default_tz));
                    let hour_passed = local.date_naive() > today
                        || (local.date_naive() == today
                            && local.hour() >= config.celebration_hour);
                    if !hour_passed {
                        continue;
                    }
                }
                due.entry(today).or_default().push(record.user_id.clone());
            }
        }
        CheckMode::Recovery { since } => {
            let today = now.date_naive();
            let horizon = today - Duration::days(config.max_lookback_days - 1);
            let start = since.date_naive().max(horizon);
            let mut date = start;
            while date <= today {
                for record in records.iter().filter(|r| !r.paused) {
                    if record.anniversary.matches(date, policy) {
                        due.entry(date).or_default().push(record.user_id.clone());
                    }
                }
                date += Duration::days(1);
            }
        }
    }

    for users in due.values_mut() {
        users.sort();
        users.dedup();
    }
    due
}

/// Convenience: the anniversary year a celebrant turns on `date`.
pub fn age_on_date(record: &AnniversaryRecord, date: chrono::NaiveDate) -> Option<i32> {
    record.anniversary.age_on(date.year())
}
