//! Text-generation integration for inbox triage.
//!
//! The classifier only needs "prompt in, generated text out", so that is the
//! whole seam. [`GeminiClient`] speaks the generateContent wire protocol;
//! tests substitute scripted generators.

pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;

use crate::error::ClassificationError;

/// One blocking-from-the-caller's-view generation call per prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Submit a prompt and return the generated text, unparsed.
    async fn generate(&self, prompt: &str) -> Result<String, ClassificationError>;
}
