//! Gemini REST generator.
//!
//! Calls `models/{model}:generateContent` with the task's sampling profile and
//! a fixed set of safety thresholds. The system and user blocks are sent as a
//! single rendered text part.

use std::time::Duration;

use async_trait::async_trait;
use peticion_core::prompt::{Prompt, Task, get_quality_profile};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::client::Generator;
use crate::error::ClientError;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
    top_k: u32,
    candidate_count: u32,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Generator backed by the Gemini `generateContent` endpoint.
pub struct GeminiGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiGenerator {
    /// Create a generator for `model` at `base_url` (no trailing slash needed).
    ///
    /// `timeout` bounds each whole request; expiry surfaces as a transport error.
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a minimal prompt to verify the key and quota.
    pub async fn probe(&self) -> Result<String, ClientError> {
        let prompt = Prompt {
            task: Task::Chat,
            system: "Eres un asistente de verificación.".into(),
            user: "Responde únicamente con la palabra OK.".into(),
            retrieval_query: String::new(),
            profile: get_quality_profile("basic_analysis"),
        };
        self.generate(&prompt).await
    }
}

fn request_body<'a>(prompt: &Prompt, rendered: &'a str) -> GenerateRequest<'a> {
    GenerateRequest {
        contents: vec![RequestContent {
            role: "user",
            parts: vec![RequestPart { text: rendered }],
        }],
        generation_config: GenerationConfig {
            temperature: prompt.profile.temperature,
            max_output_tokens: prompt.profile.max_tokens,
            top_p: prompt.profile.top_p,
            top_k: prompt.profile.top_k,
            candidate_count: 1,
        },
        safety_settings: SAFETY_CATEGORIES
            .into_iter()
            .map(|category| SafetySetting {
                category,
                threshold: SAFETY_THRESHOLD,
            })
            .collect(),
    }
}

/// Pull the text out of a decoded response, or explain why there is none.
fn response_text(response: GenerateResponse) -> Result<String, ClientError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".into());
        return Err(ClientError::Malformed(format!("prompt blocked: {reason}")));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return match candidate.finish_reason.as_deref() {
            Some("SAFETY") => Err(ClientError::Malformed("response blocked by safety filter".into())),
            _ => Err(ClientError::EmptyResponse),
        };
    }
    Ok(text)
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, ClientError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let rendered = prompt.render();
        let body = request_body(prompt, &rendered);

        info!(model = %self.model, task = %prompt.task, chars = rendered.len(), "requesting generation");
        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), task = %prompt.task, "generation request rejected");
            return Err(ClientError::from_status(status.as_u16(), body));
        }

        let raw = resp.text().await?;
        let decoded: GenerateResponse = serde_json::from_str(&raw)?;
        let text = response_text(decoded)?;
        debug!(task = %prompt.task, chars = text.len(), "generation complete");
        Ok(text)
    }
}
