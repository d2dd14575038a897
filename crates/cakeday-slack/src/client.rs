use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info, warn};

use cakeday_content::RenderedBatch;
use cakeday_scheduler::{Transport, TransportError, UserProfile};

use crate::error::{Result, SlackError};
use crate::send::split_chunks;
use crate::wire::{Envelope, MembersResponse, UploadUrlResponse, UserInfoResponse};

/// Delay between consecutive message chunks, to stay under Slack's
/// per-channel rate limit.
const CHUNK_DELAY_MS: u64 = 200;

pub struct SlackClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
    /// Channel everything is posted to; its membership doubles as the
    /// opt-out roster.
    channel: String,
}

impl SlackClient {
    pub fn new(token: String, channel: String) -> Self {
        Self::with_base_url(token, channel, "https://slack.com".to_string())
    }

    /// Overridable base URL, used by tests against a local HTTP stub.
    pub fn with_base_url(token: String, channel: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base_url,
            channel,
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/api/{}", self.base_url, method)
    }

    /// Post one message to the celebration channel, splitting it into
    /// multiple messages when it exceeds the render limit.
    pub async fn post_message(&self, text: &str) -> Result<()> {
        let chunks = split_chunks(text);
        for (i, chunk) in chunks.iter().enumerate() {
            let resp = self
                .client
                .post(self.url("chat.postMessage"))
                .bearer_auth(&self.token)
                .json(&json!({ "channel": self.channel, "text": chunk }))
                .send()
                .await?;
            let envelope: Envelope = resp
                .json()
                .await
                .map_err(|e| SlackError::Parse(e.to_string()))?;
            if !envelope.ok {
                return Err(SlackError::Api {
                    method: "chat.postMessage".to_string(),
                    code: envelope.error.unwrap_or_else(|| "unknown".to_string()),
                });
            }
            if i + 1 < chunks.len() {
                tokio::time::sleep(Duration::from_millis(CHUNK_DELAY_MS)).await;
            }
        }
        debug!(chunks = chunks.len(), "message posted");
        Ok(())
    }

    /// Upload one PNG to the celebration channel via the external upload
    /// flow: reserve a URL, push the bytes, then complete with a title.
    pub async fn upload_png(&self, filename: &str, title: &str, png: &[u8]) -> Result<()> {
        let resp = self
            .client
            .get(self.url("files.getUploadURLExternal"))
            .bearer_auth(&self.token)
            .query(&[("filename", filename), ("length", &png.len().to_string())])
            .send()
            .await?;
        let reserved: UploadUrlResponse = resp
            .json()
            .await
            .map_err(|e| SlackError::Parse(e.to_string()))?;
        if !reserved.ok {
            return Err(SlackError::Api {
                method: "files.getUploadURLExternal".to_string(),
                code: reserved.error.unwrap_or_else(|| "unknown".to_string()),
            });
        }
        let (upload_url, file_id) = match (reserved.upload_url, reserved.file_id) {
            (Some(u), Some(f)) => (u, f),
            _ => {
                return Err(SlackError::Parse(
                    "upload reservation missing upload_url or file_id".to_string(),
                ))
            }
        };

        let push = self
            .client
            .post(&upload_url)
            .body(png.to_vec())
            .send()
            .await?;
        if !push.status().is_success() {
            return Err(SlackError::Upload(format!(
                "byte push returned HTTP {}",
                push.status()
            )));
        }

        let resp = self
            .client
            .post(self.url("files.completeUploadExternal"))
            .bearer_auth(&self.token)
            .json(&json!({
                "files": [{ "id": file_id, "title": title }],
                "channel_id": self.channel,
            }))
            .send()
            .await?;
        let envelope: Envelope = resp
            .json()
            .await
            .map_err(|e| SlackError::Parse(e.to_string()))?;
        if !envelope.ok {
            return Err(SlackError::Api {
                method: "files.completeUploadExternal".to_string(),
                code: envelope.error.unwrap_or_else(|| "unknown".to_string()),
            });
        }
        info!(%filename, "image uploaded");
        Ok(())
    }

    pub async fn user_info(&self, user_id: &str) -> Result<UserProfile> {
        let resp = self
            .client
            .get(self.url("users.info"))
            .bearer_auth(&self.token)
            .query(&[("user", user_id)])
            .send()
            .await?;
        let info: UserInfoResponse = resp
            .json()
            .await
            .map_err(|e| SlackError::Parse(e.to_string()))?;
        if !info.ok {
            return Err(SlackError::Api {
                method: "users.info".to_string(),
                code: info.error.unwrap_or_else(|| "unknown".to_string()),
            });
        }
        let user = info
            .user
            .ok_or_else(|| SlackError::Parse("users.info returned no user".to_string()))?;

        let profile = user.profile.unwrap_or_else(|| crate::wire::UserProfileObject {
            display_name: None,
            real_name: None,
            title: None,
            image_512: None,
        });
        // Slack leaves display_name empty for users who never set one.
        let display_name = profile
            .display_name
            .filter(|n| !n.is_empty())
            .or(profile.real_name.filter(|n| !n.is_empty()));

        Ok(UserProfile {
            display_name,
            title: profile.title.filter(|t| !t.is_empty()),
            timezone: user.tz,
            photo_url: profile.image_512,
            is_bot: user.is_bot,
            deleted: user.deleted,
        })
    }

    /// All members of the celebration channel, following pagination.
    pub async fn members(&self) -> Result<Vec<String>> {
        let mut all = Vec::new();
        let mut cursor = String::new();
        loop {
            let mut query = vec![
                ("channel", self.channel.clone()),
                ("limit", "200".to_string()),
            ];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.clone()));
            }
            let resp = self
                .client
                .get(self.url("conversations.members"))
                .bearer_auth(&self.token)
                .query(&query)
                .send()
                .await?;
            let page: MembersResponse = resp
                .json()
                .await
                .map_err(|e| SlackError::Parse(e.to_string()))?;
            if !page.ok {
                return Err(SlackError::Api {
                    method: "conversations.members".to_string(),
                    code: page.error.unwrap_or_else(|| "unknown".to_string()),
                });
            }
            all.extend(page.members);
            cursor = page
                .response_metadata
                .map(|m| m.next_cursor)
                .unwrap_or_default();
            if cursor.is_empty() {
                return Ok(all);
            }
        }
    }
}

impl From<SlackError> for TransportError {
    fn from(e: SlackError) -> Self {
        match e {
            SlackError::Api { method, code } => TransportError::Api {
                code,
                message: format!("slack {method}"),
            },
            other => TransportError::DeliveryFailed(other.to_string()),
        }
    }
}

#[async_trait]
impl Transport for SlackClient {
    /// Post the batch text, then each image. Image failures are logged and
    /// dropped so the celebration is never blocked on uploads.
    async fn send(&self, rendered: &RenderedBatch) -> std::result::Result<(), TransportError> {
        self.post_message(&rendered.text).await?;
        for image in &rendered.images {
            let filename = format!("celebration_{}.png", image.user_id.to_lowercase());
            if let Err(e) = self.upload_png(&filename, &image.title, &image.png).await {
                warn!(user_id = %image.user_id, error = %e, "image upload failed, continuing text-only");
            }
        }
        Ok(())
    }

    async fn profile(&self, user_id: &str) -> std::result::Result<UserProfile, TransportError> {
        Ok(self.user_info(user_id).await?)
    }

    async fn channel_members(&self) -> std::result::Result<Vec<String>, TransportError> {
        Ok(self.members().await?)
    }
}
