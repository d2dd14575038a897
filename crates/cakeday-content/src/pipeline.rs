use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use futures_util::future::join_all;
use tracing::{info, warn};

use crate::provider::{FactProvider, GenerationError, ImageGenerator, TextGenerator};
use crate::templates;
use crate::types::{CelebrantImage, CelebrationContext, ContentSource, RenderedBatch};

/// Orchestrates text and image generation for one batch, with fallback.
///
/// All backends are optional: `None` means the feature is disabled in
/// config, which takes the same path as a backend failure. `render` itself
/// cannot fail — the template fallback always produces text.
pub struct ContentPipeline {
    text: Option<Arc<dyn TextGenerator>>,
    image: Option<Arc<dyn ImageGenerator>>,
    facts: Option<Arc<dyn FactProvider>>,
    personality: String,
    timeout: Duration,
    /// One facts lookup per date; later batches for the same date (other
    /// timezones, the safety net) reuse it.
    fact_cache: Mutex<HashMap<NaiveDate, String>>,
}

impl ContentPipeline {
    pub fn new(
        text: Option<Arc<dyn TextGenerator>>,
        image: Option<Arc<dyn ImageGenerator>>,
        facts: Option<Arc<dyn FactProvider>>,
        personality: String,
        timeout: Duration,
    ) -> Self {
        Self {
            text,
            image,
            facts,
            personality,
            timeout,
            fact_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Template-only pipeline (no backends configured).
    pub fn disabled(personality: String) -> Self {
        Self::new(None, None, None, personality, Duration::from_secs(30))
    }

    pub async fn render(&self, ctx: &CelebrationContext) -> RenderedBatch {
        let mut ctx = ctx.clone();
        ctx.date_facts = self.date_facts(ctx.date).await;
        let ctx = &ctx;

        let (text, source) = match self.generate_text(ctx).await {
            Ok(text) => (text, ContentSource::Generated),
            Err(e) => {
                if self.text.is_some() {
                    warn!(error = %e, "text generation failed, using template");
                }
                (
                    templates::consolidated_message(&self.personality, &ctx.celebrants),
                    ContentSource::Template,
                )
            }
        };

        let images = self.generate_images(ctx).await;

        info!(
            date = %ctx.date,
            celebrants = ctx.celebrants.len(),
            images = images.len(),
            generated = source == ContentSource::Generated,
            "batch rendered"
        );

        RenderedBatch {
            text,
            images,
            source,
        }
    }

    /// Shareable facts for `date`, cached after the first successful
    /// lookup. Any failure means generating without facts, never a failed
    /// batch.
    async fn date_facts(&self, date: NaiveDate) -> Option<String> {
        let provider = self.facts.as_ref()?;
        if let Some(cached) = self.fact_cache.lock().unwrap().get(&date) {
            return Some(cached.clone());
        }
        match tokio::time::timeout(self.timeout, provider.date_facts(date)).await {
            Ok(Ok(facts)) if !facts.trim().is_empty() => {
                self.fact_cache
                    .lock()
                    .unwrap()
                    .insert(date, facts.clone());
                Some(facts)
            }
            Ok(Ok(_)) => None,
            Ok(Err(e)) => {
                warn!(error = %e, "date facts lookup failed, generating without them");
                None
            }
            Err(_) => {
                warn!("date facts lookup timed out, generating without them");
                None
            }
        }
    }

    async fn generate_text(&self, ctx: &CelebrationContext) -> Result<String, GenerationError> {
        let Some(ref gen) = self.text else {
            return Err(GenerationError::Unavailable("text generation disabled".into()));
        };
        tokio::time::timeout(self.timeout, gen.generate_text(ctx))
            .await
            .map_err(|_| GenerationError::Timeout {
                ms: self.timeout.as_millis() as u64,
            })?
    }

    /// One image per celebrant, requested concurrently. A failed image drops
    /// that celebrant to text-only; order follows the batch order.
    async fn generate_images(&self, ctx: &CelebrationContext) -> Vec<CelebrantImage> {
        let Some(ref gen) = self.image else {
            return Vec::new();
        };

        let futures = ctx.celebrants.iter().map(|celebrant| {
            let gen = Arc::clone(gen);
            let timeout = self.timeout;
            async move {
                let result = tokio::time::timeout(timeout, gen.generate_image(celebrant))
                    .await
                    .map_err(|_| GenerationError::Timeout {
                        ms: timeout.as_millis() as u64,
                    })
                    .and_then(|r| r);
                (celebrant, result)
            }
        });

        let mut images = Vec::new();
        for (celebrant, result) in join_all(futures).await {
            match result {
                Ok(png) => images.push(CelebrantImage {
                    user_id: celebrant.user_id.clone(),
                    title: templates::image_title(&self.personality, celebrant),
                    png,
                }),
                Err(e) => {
                    warn!(
                        user_id = %celebrant.user_id,
                        error = %e,
                        "image generation failed, continuing text-only"
                    );
                }
            }
        }
        images
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CelebrantProfile;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    struct FixedText(String);

    #[async_trait]
    impl TextGenerator for FixedText {
        async fn generate_text(
            &self,
            _ctx: &CelebrationContext,
        ) -> Result<String, GenerationError> {
            Ok(self.0.clone())
        }
    }

    struct FailingText;

    #[async_trait]
    impl TextGenerator for FailingText {
        async fn generate_text(
            &self,
            _ctx: &CelebrationContext,
        ) -> Result<String, GenerationError> {
            Err(GenerationError::Unavailable("down".into()))
        }
    }

    /// Fails for one specific user, succeeds for everyone else.
    struct FlakyImages {
        fail_for: String,
    }

    #[async_trait]
    impl ImageGenerator for FlakyImages {
        async fn generate_image(
            &self,
            celebrant: &CelebrantProfile,
        ) -> Result<Vec<u8>, GenerationError> {
            if celebrant.user_id == self.fail_for {
                Err(GenerationError::Api {
                    status: 500,
                    message: "boom".into(),
                })
            } else {
                Ok(vec![1, 2, 3])
            }
        }
    }

    struct FixedFacts(String);

    #[async_trait]
    impl FactProvider for FixedFacts {
        async fn date_facts(&self, _date: NaiveDate) -> Result<String, GenerationError> {
            Ok(self.0.clone())
        }
    }

    struct CountingFacts(std::sync::atomic::AtomicUsize);

    #[async_trait]
    impl FactProvider for CountingFacts {
        async fn date_facts(&self, _date: NaiveDate) -> Result<String, GenerationError> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok("On this day the metric system was adopted.".into())
        }
    }

    struct FailingFacts;

    #[async_trait]
    impl FactProvider for FailingFacts {
        async fn date_facts(&self, _date: NaiveDate) -> Result<String, GenerationError> {
            Err(GenerationError::Unavailable("search down".into()))
        }
    }

    /// Echoes the facts it was handed, so tests can see what reached the
    /// generator.
    struct EchoFactsText;

    #[async_trait]
    impl TextGenerator for EchoFactsText {
        async fn generate_text(
            &self,
            ctx: &CelebrationContext,
        ) -> Result<String, GenerationError> {
            Ok(ctx.date_facts.clone().unwrap_or_else(|| "no facts".into()))
        }
    }

    fn ctx(users: &[&str]) -> CelebrationContext {
        CelebrationContext {
            date: NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
            celebrants: users.iter().map(|u| CelebrantProfile::bare(u)).collect(),
            date_facts: None,
        }
    }

    #[tokio::test]
    async fn generated_text_is_used_when_backend_works() {
        let pipeline = ContentPipeline::new(
            Some(Arc::new(FixedText("hello <@U1>".into()))),
            None,
            None,
            "standard".into(),
            Duration::from_secs(5),
        );
        let rendered = pipeline.render(&ctx(&["U1"])).await;
        assert_eq!(rendered.text, "hello <@U1>");
        assert_eq!(rendered.source, ContentSource::Generated);
    }

    #[tokio::test]
    async fn backend_failure_falls_back_to_template() {
        let pipeline = ContentPipeline::new(
            Some(Arc::new(FailingText)),
            None,
            None,
            "standard".into(),
            Duration::from_secs(5),
        );
        let rendered = pipeline.render(&ctx(&["U1"])).await;
        assert_eq!(rendered.source, ContentSource::Template);
        assert!(rendered.text.contains("<@U1>"));
    }

    #[tokio::test]
    async fn disabled_pipeline_always_renders_template() {
        let pipeline = ContentPipeline::disabled("pirate".into());
        let rendered = pipeline.render(&ctx(&["U1", "U2"])).await;
        assert_eq!(rendered.source, ContentSource::Template);
        assert!(rendered.text.contains("Birthday Twins"));
        assert!(rendered.images.is_empty());
    }

    #[tokio::test]
    async fn image_failure_degrades_only_that_celebrant() {
        let pipeline = ContentPipeline::new(
            Some(Arc::new(FixedText("hi <@U1> <@U2>".into()))),
            Some(Arc::new(FlakyImages {
                fail_for: "U1".into(),
            })),
            None,
            "standard".into(),
            Duration::from_secs(5),
        );
        let rendered = pipeline.render(&ctx(&["U1", "U2"])).await;
        assert_eq!(rendered.images.len(), 1);
        assert_eq!(rendered.images[0].user_id, "U2");
        assert_eq!(rendered.source, ContentSource::Generated);
    }

    #[tokio::test]
    async fn date_facts_reach_the_text_generator() {
        let pipeline = ContentPipeline::new(
            Some(Arc::new(EchoFactsText)),
            None,
            Some(Arc::new(FixedFacts("Ides of March, 44 BC.".into()))),
            "standard".into(),
            Duration::from_secs(5),
        );
        let rendered = pipeline.render(&ctx(&["U1"])).await;
        assert_eq!(rendered.text, "Ides of March, 44 BC.");
    }

    #[tokio::test]
    async fn facts_are_fetched_once_per_date() {
        let counter = Arc::new(CountingFacts(std::sync::atomic::AtomicUsize::new(0)));
        let pipeline = ContentPipeline::new(
            Some(Arc::new(EchoFactsText)),
            None,
            Some(counter.clone() as Arc<dyn FactProvider>),
            "standard".into(),
            Duration::from_secs(5),
        );
        // Two batches on the same date (e.g. different timezones).
        pipeline.render(&ctx(&["U1"])).await;
        pipeline.render(&ctx(&["U2"])).await;
        assert_eq!(counter.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn facts_failure_does_not_block_generation() {
        let pipeline = ContentPipeline::new(
            Some(Arc::new(EchoFactsText)),
            None,
            Some(Arc::new(FailingFacts)),
            "standard".into(),
            Duration::from_secs(5),
        );
        let rendered = pipeline.render(&ctx(&["U1"])).await;
        assert_eq!(rendered.source, ContentSource::Generated);
        assert_eq!(rendered.text, "no facts");
    }
}
