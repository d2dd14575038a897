//! `cakeday-core` — shared config, error taxonomy, and date types.
//!
//! Everything in this crate is consumed by at least two other workspace
//! members: the config structs by the bot binary and the engine, the
//! [`Anniversary`] date type by the store and the resolver, and the
//! [`Clock`] trait by every test that needs a frozen "now".

pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use config::CakedayConfig;
pub use error::{CakedayError, Result};
pub use types::{Anniversary, LeapDayPolicy};
