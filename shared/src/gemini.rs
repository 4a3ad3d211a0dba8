//! Gemini `generateContent` client used as the extraction service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::GeminiConfig;
use crate::extraction::EventExtractor;
use crate::{Error, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Outcome of one attempt: transient failures may be retried.
enum Attempt {
    Done(String),
    Transient(String),
}

/// Client for the Gemini text-generation API.
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: String,
    endpoint: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl GeminiClient {
    /// Create a client from configuration and a resolved API key.
    pub fn new(config: &GeminiConfig, api_key: String) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build Gemini HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.base_url, config.model
            ),
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
        })
    }

    async fn attempt(&self, body: &GenerateContentRequest<'_>) -> Result<Attempt> {
        let response = match self
            .http_client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() || e.is_connect() => {
                return Ok(Attempt::Transient(format!("Gemini request failed: {}", e)))
            }
            Err(e) => return Err(Error::Extraction(format!("Gemini request failed: {}", e))),
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = format!("Gemini returned {}: {}", status, error_text);
            if status.as_u16() == 429 || status.is_server_error() {
                return Ok(Attempt::Transient(message));
            }
            return Err(Error::Extraction(message));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Extraction(format!("Failed to parse Gemini response: {}", e)))?;

        extract_text(parsed).map(Attempt::Done)
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .map(|reason| format!(" (blocked: {})", reason))
            .unwrap_or_default();
        return Err(Error::Extraction(format!(
            "Gemini returned no text{}",
            reason
        )));
    }

    Ok(text)
}

#[async_trait]
impl EventExtractor for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig { temperature: 0.2 },
        };

        let mut attempt = 0;
        loop {
            match self.attempt(&body).await? {
                Attempt::Done(text) => {
                    info!(attempt, chars = text.len(), "Received response from Gemini");
                    return Ok(text);
                }
                Attempt::Transient(message) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(attempt, "Transient Gemini failure, retrying: {}", message);
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                Attempt::Transient(message) => return Err(Error::Extraction(message)),
            }
        }
    }
}
