//! Markdown conversion client.
//!
//! Sends extracted page text to an OpenAI-compatible chat-completions
//! endpoint and returns the generated Markdown verbatim. No validation is
//! performed on the output; well-formedness is the model's responsibility.

use async_trait::async_trait;

use webmark_core::{ConvertConfig, Result};

pub mod openai;

pub use openai::OpenAiConverter;

/// The conversion seam. Lets the pipeline driver run against a stub in tests.
#[async_trait]
pub trait MarkdownConverter: Send + Sync {
    /// Convert plain page text into Markdown. Single round-trip, no retry.
    async fn convert(&self, text: &str, config: &ConvertConfig) -> Result<String>;
}
