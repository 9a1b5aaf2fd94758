use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{AssistError, CompletionProvider, CompletionRequest};

pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";
pub const FALLBACK_API_KEY_ENV_VAR: &str = "GOOGLE_API_KEY";
pub const MODEL_ENV_VAR: &str = "PLAYGROUND_MODEL";

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini `generateContent` client asking for JSON answers
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<PartIn<'a>>,
}

#[derive(Serialize)]
struct PartIn<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartOut>,
}

#[derive(Deserialize)]
struct PartOut {
    text: Option<String>,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, AssistError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Configure from `GEMINI_API_KEY` (or `GOOGLE_API_KEY`) and `PLAYGROUND_MODEL`.
    pub fn from_env() -> Result<Self, AssistError> {
        let api_key = std::env::var(API_KEY_ENV_VAR)
            .or_else(|_| std::env::var(FALLBACK_API_KEY_ENV_VAR))
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(AssistError::MissingApiKey(API_KEY_ENV_VAR))?;
        let model = std::env::var(MODEL_ENV_VAR).unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self::new(api_key, model)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn generate(&self, request: CompletionRequest) -> Result<String, AssistError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let payload = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![PartIn {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                response_mime_type: "application/json",
            },
        };

        log::debug!("Calling model {}", self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("Model call failed with {}", status);
            return Err(AssistError::Provider(format!("{}: {}", status, body.trim())));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text: String = parsed
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
            return Err(AssistError::InvalidOutput("model returned no text".to_string()));
        }
        Ok(text)
    }
}

impl CompletionProvider for GeminiProvider {
    fn complete(&self, request: CompletionRequest) -> BoxFuture<'_, Result<String, AssistError>> {
        self.generate(request).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(server: &mockito::Server) -> GeminiProvider {
        GeminiProvider::new("test-key", "test-model")
            .unwrap()
            .with_base_url(server.url())
    }

    #[tokio::test]
    async fn test_returns_candidate_text() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/models/test-model:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "generationConfig": { "temperature": 0.25, "responseMimeType": "application/json" }
            })))
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "candidates": [{
                        "content": { "parts": [{ "text": "{\"ok\":" }, { "text": "true}" }] }
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let text = provider(&server)
            .complete(CompletionRequest {
                prompt: "hello".to_string(),
                temperature: Some(0.25),
            })
            .await
            .unwrap();

        m.assert_async().await;
        assert_eq!(text, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn test_error_status_is_provider_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/models/test-model:generateContent")
            .with_status(429)
            .with_body("quota")
            .create_async()
            .await;

        let err = provider(&server)
            .complete(CompletionRequest {
                prompt: "hello".to_string(),
                temperature: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AssistError::Provider(ref m) if m.contains("429")));
    }

    #[tokio::test]
    async fn test_empty_candidates_is_invalid_output() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/models/test-model:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates": []}"#)
            .create_async()
            .await;

        let err = provider(&server)
            .complete(CompletionRequest {
                prompt: "hello".to_string(),
                temperature: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AssistError::InvalidOutput(_)));
    }
}
