use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::types::{CelebrantProfile, CelebrationContext};

/// Errors from a generation backend. All of them are recovered locally by
/// the pipeline (template fallback, text-only image degradation) and never
/// fail a batch.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Backend reachable but returned an error response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Network-level failure reaching the backend.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The response arrived but could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The call exceeded its time budget.
    #[error("Generation timed out after {ms}ms")]
    Timeout { ms: u64 },
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        GenerationError::Unavailable(e.to_string())
    }
}

/// Produces one consolidated celebration message for a batch.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(&self, ctx: &CelebrationContext) -> Result<String, GenerationError>;
}

/// Produces one celebration image for a single celebrant.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(
        &self,
        celebrant: &CelebrantProfile,
    ) -> Result<Vec<u8>, GenerationError>;
}

/// Supplies shareable facts about a calendar date (notable events,
/// observances) that text generation can weave into the message.
#[async_trait]
pub trait FactProvider: Send + Sync {
    async fn date_facts(&self, date: NaiveDate) -> Result<String, GenerationError>;
}
