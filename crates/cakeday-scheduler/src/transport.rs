use async_trait::async_trait;
use thiserror::Error;

use cakeday_content::RenderedBatch;

/// Errors from the messaging transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The message (or one of its uploads) could not be delivered.
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    /// The platform API returned an error payload.
    #[error("API error ({code}): {message}")]
    Api { code: String, message: String },

    /// The call exceeded its time budget.
    #[error("Transport timed out after {ms}ms")]
    Timeout { ms: u64 },
}

/// Profile attributes the transport can resolve for a member. Everything is
/// optional — celebration must work for a user the API cannot describe.
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub display_name: Option<String>,
    pub title: Option<String>,
    pub timezone: Option<String>,
    pub photo_url: Option<String>,
    pub is_bot: bool,
    pub deleted: bool,
}

/// Messaging transport the dispatcher talks to (Slack in production,
/// recording fakes in tests).
///
/// Implementations must be `Send + Sync`; the engine drives them from a
/// single serialized pass but image uploads may run concurrently.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver a rendered batch (text plus any images) to the celebration
    /// channel. Must be all-or-nothing from the caller's view: an `Err`
    /// means the announcement did not reach the channel.
    async fn send(&self, rendered: &RenderedBatch) -> Result<(), TransportError>;

    /// Resolve profile attributes for one member.
    async fn profile(&self, user_id: &str) -> Result<UserProfile, TransportError>;

    /// Current members of the celebration channel. Absence means the user
    /// opted out of celebrations.
    async fn channel_members(&self) -> Result<Vec<String>, TransportError>;
}
