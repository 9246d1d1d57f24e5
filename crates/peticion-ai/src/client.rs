//! The model client seam.
//!
//! [`ModelClient`] is what the orchestrator talks to: one method per wizard
//! task, each returning the raw model text. Remote backends only differ in how
//! a built [`Prompt`] becomes text, which is the [`Generator`] trait;
//! [`LlmClient`] adapts any generator into a full client.

use async_trait::async_trait;
use peticion_core::prompt::{self, Prompt};
use peticion_core::{AnalysisResult, ChatContext, Problem};

use crate::error::ClientError;

/// A backend able to perform each wizard task.
///
/// Implementations return raw text. JSON extraction and validation happen
/// in the resilience layer.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &str;

    async fn analyze(&self, text: &str) -> Result<String, ClientError>;

    async fn detect_problems(
        &self,
        text: &str,
        analysis: &AnalysisResult,
    ) -> Result<String, ClientError>;

    async fn generate_recommendations(
        &self,
        text: &str,
        problems: &[Problem],
    ) -> Result<String, ClientError>;

    async fn chat(&self, question: &str, context: &ChatContext<'_>) -> Result<String, ClientError>;
}

/// Turns a fully built prompt into model text.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &Prompt) -> Result<String, ClientError>;
}

/// A [`ModelClient`] that builds the task prompt and hands it to a [`Generator`].
pub struct LlmClient<G> {
    generator: G,
}

impl<G: Generator> LlmClient<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }
}

#[async_trait]
impl<G: Generator> ModelClient for LlmClient<G> {
    fn name(&self) -> &str {
        self.generator.name()
    }

    async fn analyze(&self, text: &str) -> Result<String, ClientError> {
        self.generator.generate(&prompt::analysis_prompt(text)).await
    }

    async fn detect_problems(
        &self,
        text: &str,
        analysis: &AnalysisResult,
    ) -> Result<String, ClientError> {
        self.generator
            .generate(&prompt::problems_prompt(text, analysis))
            .await
    }

    async fn generate_recommendations(
        &self,
        text: &str,
        problems: &[Problem],
    ) -> Result<String, ClientError> {
        self.generator
            .generate(&prompt::recommendations_prompt(text, problems))
            .await
    }

    async fn chat(&self, question: &str, context: &ChatContext<'_>) -> Result<String, ClientError> {
        self.generator
            .generate(&prompt::chat_prompt(question, context))
            .await
    }
}
