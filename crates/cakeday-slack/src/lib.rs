//! `cakeday-slack` — Slack Web API transport.
//!
//! Implements the scheduler's [`Transport`](cakeday_scheduler::Transport)
//! against `chat.postMessage`, `users.info`, `conversations.members`, and
//! the external file-upload flow. Long messages are split at line
//! boundaries; image upload failures degrade to text-only.

pub mod client;
pub mod error;
pub mod send;
mod wire;

pub use client::SlackClient;
pub use error::SlackError;
