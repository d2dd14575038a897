//! `cakeday-scheduler` — the celebration scheduling and consolidation
//! engine.
//!
//! # Overview
//!
//! Three tick drivers (hourly timezone sweep, daily safety net, one-shot
//! startup recovery) all funnel into the same serialized pass:
//!
//! ```text
//! tick → resolve (store) → consolidate (ledger) → render (content)
//!      → dispatch (transport) → commit (ledger)
//! ```
//!
//! Correctness rests on the announcement ledger alone: an entry is written
//! only after the transport confirms delivery, and a (date, user) pair in
//! the ledger is never dispatched again regardless of which driver fires.
//! There is no internal retry — a failed batch is simply re-resolved by the
//! next tick.

pub mod consolidator;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod resolver;
pub mod transport;
pub mod types;

pub use dispatch::{Dispatcher, Outcome};
pub use engine::CelebrationEngine;
pub use error::{Result, SchedulerError};
pub use resolver::{resolve, CheckMode};
pub use transport::{Transport, TransportError, UserProfile};
pub use types::CelebrationBatch;
