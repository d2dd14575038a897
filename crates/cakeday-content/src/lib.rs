//! `cakeday-content` — best-effort content generation for celebration
//! batches.
//!
//! The pipeline asks an LLM for one consolidated message per batch and,
//! optionally, one image per celebrant. Every failure degrades instead of
//! propagating: text falls back to a personality template, images fall back
//! to text-only. A batch handed to [`ContentPipeline::render`] always comes
//! back renderable.

pub mod openai;
pub mod pipeline;
pub mod provider;
pub mod templates;
pub mod types;

pub use pipeline::ContentPipeline;
pub use provider::{FactProvider, GenerationError, ImageGenerator, TextGenerator};
pub use types::{CelebrantImage, CelebrantProfile, CelebrationContext, ContentSource, RenderedBatch};
