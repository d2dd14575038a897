use async_trait::async_trait;
use base64::Engine as _;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use cakeday_core::config::OpenAiConfig;

use crate::provider::{FactProvider, GenerationError, ImageGenerator, TextGenerator};
use crate::types::{join_mentions, CelebrantProfile, CelebrationContext};

/// OpenAI-backed generator for both text and images.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    image_model: String,
}

impl OpenAiGenerator {
    pub fn new(config: &OpenAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            image_model: config.image_model.clone(),
        }
    }

    /// One chat completion, returning the first choice's content.
    async fn chat(&self, body: serde_json::Value) -> Result<String, GenerationError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "OpenAI chat API error");
            return Err(GenerationError::Api {
                status,
                message: text,
            });
        }

        let api_resp: ChatResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        let content = api_resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(GenerationError::Parse("empty completion".to_string()));
        }
        Ok(content)
    }
}

fn build_system_prompt(ctx: &CelebrationContext) -> String {
    let mut facts = Vec::new();
    for c in &ctx.celebrants {
        let mut line = format!("- {} (mention them as {})", c.display_name, c.mention());
        if let Some(ref title) = c.title {
            line.push_str(&format!(", works as {title}"));
        }
        if let Some(age) = c.age {
            line.push_str(&format!(", turns {age} today"));
        }
        facts.push(line);
    }
    let mut prompt = format!(
        "You are a workplace birthday bot. Write ONE short, warm, funny Slack \
         message celebrating everyone below together (do not write separate \
         messages per person). Use Slack emoji codes like :tada:. You MUST \
         include every mention exactly as given, plus <!here> once.\n\n\
         Celebration date: {}\nCelebrants:\n{}",
        ctx.date,
        facts.join("\n")
    );
    if let Some(ref date_facts) = ctx.date_facts {
        prompt.push_str(&format!(
            "\n\nFun facts about this date you may weave in:\n{date_facts}"
        ));
    }
    prompt
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate_text(&self, ctx: &CelebrationContext) -> Result<String, GenerationError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": build_system_prompt(ctx) },
                { "role": "user", "content": "Write the birthday message now." }
            ],
            "max_tokens": 600,
        });

        debug!(model = %self.model, celebrants = ctx.celebrants.len(), "requesting birthday text");
        let content = self.chat(body).await?;

        // A message that dropped someone's mention reads as a snub; treat it
        // as a generation failure so the template takes over.
        let missing = ctx
            .celebrants
            .iter()
            .any(|c| !content.contains(&c.mention()));
        if missing {
            warn!(
                expected = %join_mentions(&ctx.celebrants),
                "generated message missing a required mention"
            );
            return Err(GenerationError::Parse(
                "completion missing required mention".to_string(),
            ));
        }

        Ok(content)
    }
}

#[async_trait]
impl ImageGenerator for OpenAiGenerator {
    async fn generate_image(
        &self,
        celebrant: &CelebrantProfile,
    ) -> Result<Vec<u8>, GenerationError> {
        let url = format!("{}/v1/images/generations", self.base_url);
        let mut prompt = format!(
            "A joyful, colourful birthday illustration for {}, with a cake, \
             balloons and confetti. Cartoon style, no text in the image.",
            celebrant.display_name
        );
        if let Some(ref title) = celebrant.title {
            prompt.push_str(&format!(" Include a playful nod to their job: {title}."));
        }

        let body = serde_json::json!({
            "model": self.image_model,
            "prompt": prompt,
            "n": 1,
            "size": "1024x1024",
        });

        debug!(model = %self.image_model, user_id = %celebrant.user_id, "requesting birthday image");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "OpenAI image API error");
            return Err(GenerationError::Api {
                status,
                message: text,
            });
        }

        let api_resp: ImageResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        let b64 = api_resp
            .data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .ok_or_else(|| GenerationError::Parse("no image data in response".to_string()))?;

        base64::engine::general_purpose::STANDARD
            .decode(b64)
            .map_err(|e| GenerationError::Parse(e.to_string()))
    }
}

#[async_trait]
impl FactProvider for OpenAiGenerator {
    async fn date_facts(&self, date: NaiveDate) -> Result<String, GenerationError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": "You share short, fun, workplace-safe trivia." },
                { "role": "user", "content": format!(
                    "List two or three short fun facts about {} in history. \
                     Plain sentences, no preamble, no numbering.",
                    date.format("%B %-d")
                ) }
            ],
            "max_tokens": 200,
        });

        debug!(model = %self.model, %date, "requesting date facts");
        self.chat(body).await
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}
