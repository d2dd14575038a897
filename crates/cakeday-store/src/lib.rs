//! `cakeday-store` — SQLite persistence for anniversary records and the
//! announcement ledger.
//!
//! Two tables matter to the engine:
//!
//! | Table           | Purpose                                              |
//! |-----------------|------------------------------------------------------|
//! | `birthdays`     | one row per member: month/day/year, timezone, paused |
//! | `announcements` | (date, user) pairs already celebrated — the ledger   |
//!
//! `engine_state` additionally records the last successful tick so the
//! startup recovery pass knows how far to look back.

pub mod db;
pub mod error;
pub mod ledger;
pub mod state;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use ledger::Ledger;
pub use state::EngineState;
pub use store::BirthdayStore;
pub use types::{AnniversaryRecord, DetectionPath};
