use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Everything the generators may use about one celebrant. All fields except
/// `user_id` are best-effort; a missing profile yields a bare mention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CelebrantProfile {
    pub user_id: String,
    pub display_name: String,
    /// Job title from the profile, when set.
    pub title: Option<String>,
    /// Age turned today, when a birth year is on record.
    pub age: Option<i32>,
    pub timezone: String,
    /// Profile photo URL, fed to image generation when available.
    pub photo_url: Option<String>,
}

impl CelebrantProfile {
    /// Minimal profile used when the transport could not resolve the user.
    pub fn bare(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            display_name: user_id.to_string(),
            title: None,
            age: None,
            timezone: String::new(),
            photo_url: None,
        }
    }

    /// Slack mention markup for this celebrant.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.user_id)
    }
}

/// Input to the content pipeline: one celebration date and everyone being
/// celebrated on it.
#[derive(Debug, Clone)]
pub struct CelebrationContext {
    pub date: NaiveDate,
    pub celebrants: Vec<CelebrantProfile>,
    /// Shareable facts about the date, filled in by the pipeline when a
    /// fact provider is configured and its lookup succeeded.
    pub date_facts: Option<String>,
}

/// A generated image for one celebrant.
#[derive(Debug, Clone)]
pub struct CelebrantImage {
    pub user_id: String,
    pub title: String,
    pub png: Vec<u8>,
}

/// Where the rendered text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    /// Produced by the LLM backend.
    Generated,
    /// Personality fallback template (backend failed or disabled).
    Template,
}

/// Output of the content pipeline, ready for dispatch.
#[derive(Debug, Clone)]
pub struct RenderedBatch {
    pub text: String,
    pub images: Vec<CelebrantImage>,
    pub source: ContentSource,
}

/// Join mentions the way a sentence would: "a", "a and b", "a, b, and c".
pub fn join_mentions(celebrants: &[CelebrantProfile]) -> String {
    let mentions: Vec<String> = celebrants.iter().map(|c| c.mention()).collect();
    match mentions.len() {
        0 => String::new(),
        1 => mentions[0].clone(),
        2 => format!("{} and {}", mentions[0], mentions[1]),
        _ => format!(
            "{}, and {}",
            mentions[..mentions.len() - 1].join(", "),
            mentions[mentions.len() - 1]
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str) -> CelebrantProfile {
        CelebrantProfile::bare(id)
    }

    #[test]
    fn mention_join_forms() {
        assert_eq!(join_mentions(&[profile("U1")]), "<@U1>");
        assert_eq!(
            join_mentions(&[profile("U1"), profile("U2")]),
            "<@U1> and <@U2>"
        );
        assert_eq!(
            join_mentions(&[profile("U1"), profile("U2"), profile("U3")]),
            "<@U1>, <@U2>, and <@U3>"
        );
    }
}
