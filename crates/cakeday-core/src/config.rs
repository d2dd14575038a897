use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::types::LeapDayPolicy;

/// Local hour (0-23) at which a member is celebrated in their own timezone.
pub const DEFAULT_CELEBRATION_HOUR: u32 = 9;
/// UTC hour of the daily safety-net check.
pub const DEFAULT_DAILY_CHECK_HOUR: u32 = 10;
/// Maximum days the startup recovery pass will look back.
pub const DEFAULT_MAX_LOOKBACK_DAYS: i64 = 7;
/// Days of announcement history kept before pruning.
pub const DEFAULT_RETENTION_DAYS: i64 = 60;
/// Per-call timeout against Slack and OpenAI.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Top-level config (cakeday.toml + CAKEDAY_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CakedayConfig {
    pub slack: SlackConfig,
    #[serde(default)]
    pub openai: Option<OpenAiConfig>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    pub bot_token: String,
    /// Channel everything is posted to. Members who leave it are treated as
    /// opted out.
    pub celebration_channel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_text_model")]
    pub model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    /// Per-celebrant image generation. Text generation is always attempted
    /// when this provider is configured.
    #[serde(default = "bool_true")]
    pub image_generation: bool,
    /// Fetch fun facts about the celebration date and feed them to text
    /// generation.
    #[serde(default = "bool_true")]
    pub date_facts: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// What to do when delivery succeeded but the ledger commit failed.
///
/// `Resend` treats it as a dispatch failure: the next tick rebuilds the batch
/// and may double-send. `Suppress` reports success and risks a silent miss if
/// the process dies before a later commit succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LedgerWritePolicy {
    #[default]
    Resend,
    Suppress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_celebration_hour")]
    pub celebration_hour: u32,
    #[serde(default = "default_daily_check_hour")]
    pub daily_check_hour: u32,
    #[serde(default = "default_max_lookback_days")]
    pub max_lookback_days: i64,
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    #[serde(default)]
    pub leap_day_policy: LeapDayPolicy,
    /// Applied when a record's timezone is missing or unparseable.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    #[serde(default)]
    pub on_ledger_write_failure: LedgerWritePolicy,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Fallback template personality (e.g. "standard", "pirate", "mystic-dog").
    #[serde(default = "default_personality")]
    pub personality: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            celebration_hour: DEFAULT_CELEBRATION_HOUR,
            daily_check_hour: DEFAULT_DAILY_CHECK_HOUR,
            max_lookback_days: DEFAULT_MAX_LOOKBACK_DAYS,
            retention_days: DEFAULT_RETENTION_DAYS,
            leap_day_policy: LeapDayPolicy::default(),
            default_timezone: default_timezone(),
            on_ledger_write_failure: LedgerWritePolicy::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            personality: default_personality(),
        }
    }
}

impl ScheduleConfig {
    pub fn default_tz(&self) -> chrono_tz::Tz {
        crate::types::parse_timezone(&self.default_timezone, chrono_tz::UTC)
    }
}

fn bool_true() -> bool {
    true
}
fn default_celebration_hour() -> u32 {
    DEFAULT_CELEBRATION_HOUR
}
fn default_daily_check_hour() -> u32 {
    DEFAULT_DAILY_CHECK_HOUR
}
fn default_max_lookback_days() -> i64 {
    DEFAULT_MAX_LOOKBACK_DAYS
}
fn default_retention_days() -> i64 {
    DEFAULT_RETENTION_DAYS
}
fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
fn default_timezone() -> String {
    "UTC".to_string()
}
fn default_personality() -> String {
    "standard".to_string()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_text_model() -> String {
    "gpt-4o".to_string()
}
fn default_image_model() -> String {
    "gpt-image-1".to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cakeday/cakeday.db", home)
}

impl CakedayConfig {
    /// Load config from a TOML file with CAKEDAY_* env var overrides.
    ///
    /// Checks in order: explicit path argument, then ~/.cakeday/cakeday.toml.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: CakedayConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CAKEDAY_").split("_"))
            .extract()
            .map_err(|e| crate::error::CakedayError::Config(e.to_string()))?;

        if config.schedule.celebration_hour > 23 || config.schedule.daily_check_hour > 23 {
            return Err(crate::error::CakedayError::Config(
                "celebration_hour and daily_check_hour must be 0-23".to_string(),
            ));
        }
        if config.schedule.retention_days < 2 * config.schedule.max_lookback_days {
            return Err(crate::error::CakedayError::Config(format!(
                "retention_days ({}) must be at least twice max_lookback_days ({})",
                config.schedule.retention_days, config.schedule.max_lookback_days
            )));
        }

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cakeday/cakeday.toml", home)
}
