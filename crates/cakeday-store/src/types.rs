use serde::{Deserialize, Serialize};

use cakeday_core::Anniversary;

/// A persisted anniversary record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnniversaryRecord {
    /// Slack user ID — primary key, opaque to the engine.
    pub user_id: String,
    /// Recurring month/day plus optional birth year.
    pub anniversary: Anniversary,
    /// IANA timezone name from the user's profile. Empty means unknown;
    /// the resolver substitutes the configured default.
    pub timezone: String,
    /// Suppresses celebration without deleting the record.
    pub paused: bool,
    /// ISO-8601 timestamp of record creation.
    pub created_at: String,
    /// ISO-8601 timestamp of the last update.
    pub updated_at: String,
}

/// Which tick driver produced an announcement. Recorded as ledger metadata;
/// the at-most-once key is (date, user) regardless of path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionPath {
    Hourly,
    Daily,
    Recovery,
}

impl std::fmt::Display for DetectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DetectionPath::Hourly => "hourly",
            DetectionPath::Daily => "daily",
            DetectionPath::Recovery => "recovery",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for DetectionPath {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(DetectionPath::Hourly),
            "daily" => Ok(DetectionPath::Daily),
            "recovery" => Ok(DetectionPath::Recovery),
            other => Err(format!("unknown detection path: {other}")),
        }
    }
}
