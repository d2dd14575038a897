use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Earliest birth year accepted when a record carries one.
pub const MIN_BIRTH_YEAR: i32 = 1900;

/// What to do with a Feb 29 anniversary in a non-leap year.
///
/// Applied identically by every detection path so a leap-day birthday is
/// celebrated exactly once per year, never zero or twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeapDayPolicy {
    /// Celebrate on March 1 (the day after the "missing" Feb 29).
    #[default]
    MarchFirst,
    /// Celebrate on February 28.
    FebTwentyEighth,
}

/// A recurring anniversary: month/day, with an optional birth year used only
/// for "turns N" facts in generated content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anniversary {
    pub month: u32,
    pub day: u32,
    pub year: Option<i32>,
}

impl Anniversary {
    /// Validate month/day (and year range, when present).
    ///
    /// Day/month must form a real calendar date; Feb 29 is accepted and
    /// handled by [`LeapDayPolicy`] at resolution time.
    pub fn new(month: u32, day: u32, year: Option<i32>) -> crate::error::Result<Self> {
        // Validate against a leap year so Feb 29 passes.
        if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
            return Err(crate::error::CakedayError::InvalidDate { month, day });
        }
        if let Some(y) = year {
            let current = chrono::Utc::now().year();
            if y < MIN_BIRTH_YEAR || y > current {
                return Err(crate::error::CakedayError::InvalidYear(y));
            }
        }
        Ok(Self { month, day, year })
    }

    pub fn is_leap_day(&self) -> bool {
        self.month == 2 && self.day == 29
    }

    /// The calendar date this anniversary is celebrated on in `year`.
    pub fn celebration_date(&self, year: i32, policy: LeapDayPolicy) -> NaiveDate {
        if let Some(d) = NaiveDate::from_ymd_opt(year, self.month, self.day) {
            return d;
        }
        // Only Feb 29 in a non-leap year can fail above.
        match policy {
            LeapDayPolicy::MarchFirst => NaiveDate::from_ymd_opt(year, 3, 1).unwrap(),
            LeapDayPolicy::FebTwentyEighth => NaiveDate::from_ymd_opt(year, 2, 28).unwrap(),
        }
    }

    /// Whether `date` is this anniversary's celebration day in `date`'s year.
    pub fn matches(&self, date: NaiveDate, policy: LeapDayPolicy) -> bool {
        self.celebration_date(date.year(), policy) == date
    }

    /// Age turned on the anniversary falling in `on_year`, if a birth year is known.
    pub fn age_on(&self, on_year: i32) -> Option<i32> {
        self.year.map(|y| on_year - y)
    }
}

impl std::fmt::Display for Anniversary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.year {
            Some(y) => write!(f, "{:02}/{:02}/{}", self.day, self.month, y),
            None => write!(f, "{:02}/{:02}", self.day, self.month),
        }
    }
}

/// Parse an IANA timezone name, falling back to `default` when missing or
/// unknown (Slack profiles occasionally carry stale or empty tz strings).
pub fn parse_timezone(name: &str, default: chrono_tz::Tz) -> chrono_tz::Tz {
    if name.is_empty() {
        return default;
    }
    match name.parse::<chrono_tz::Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::debug!(timezone = %name, "unknown timezone, using default");
            default
        }
    }
}
