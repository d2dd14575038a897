use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlackError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Slack returned `ok: false`; `code` is its `error` field.
    #[error("Slack API error in {method}: {code}")]
    Api { method: String, code: String },

    #[error("Unexpected Slack response: {0}")]
    Parse(String),

    #[error("File upload failed: {0}")]
    Upload(String),
}

pub type Result<T> = std::result::Result<T, SlackError>;
