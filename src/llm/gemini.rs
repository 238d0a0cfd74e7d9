//! Google Gemini `generateContent` client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ProviderError, StreamError};

use super::sse::{self, Flow};
use super::{ChunkHandler, ClientConfig, PartialUsage, Response, SYSTEM_PROMPT, TextGenerator, TokenUsage, http};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROVIDER: &str = "gemini";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: ClientConfig,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: ClientConfig, http: reqwest::Client) -> Self {
        let base_url = config.base_url_or(DEFAULT_GEMINI_BASE_URL);
        Self {
            http,
            config,
            base_url,
        }
    }

    pub fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.config.model)
    }

    pub fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.config.model
        )
    }

    fn request(&self, url: String, prompt: &str) -> reqwest::RequestBuilder {
        let body = GenerateRequest {
            contents: [Content {
                role: Some("user"),
                parts: [Part { text: prompt }],
            }],
            system_instruction: Content {
                role: None,
                parts: [Part {
                    text: SYSTEM_PROMPT,
                }],
            },
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                max_output_tokens: self.config.max_tokens,
            },
        };
        debug!("POST {}", url);
        self.http
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    system_instruction: Content<'a>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
    total_token_count: Option<u64>,
    cached_content_token_count: Option<u64>,
    thoughts_token_count: Option<u64>,
}

impl UsageMetadata {
    fn partial(&self) -> PartialUsage {
        PartialUsage {
            prompt_tokens: self.prompt_token_count,
            completion_tokens: self.candidates_token_count,
            total_tokens: self.total_token_count,
            cached_tokens: self.cached_content_token_count,
            reasoning_tokens: self.thoughts_token_count,
        }
    }
}

impl GenerateResponse {
    /// Answer text of the first candidate, skipping thought summaries.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        Some(
            content
                .parts
                .iter()
                .filter(|p| !p.thought)
                .filter_map(|p| p.text.as_deref())
                .collect(),
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn chat_completion(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
    ) -> Result<Response, ProviderError> {
        let request = self.request(self.generate_url(), prompt);
        let response = http::send(PROVIDER, cancel, request).await?;
        let body: GenerateResponse = http::read_json(PROVIDER, cancel, response).await?;

        let text = body.text().ok_or_else(|| ProviderError::InvalidResponse {
            provider: PROVIDER,
            reason: "response contained no candidates".to_string(),
        })?;
        let usage = body
            .usage_metadata
            .map(|u| u.partial().into_usage())
            .unwrap_or_default()
            .with_derived_total();

        Ok(Response { text, usage })
    }

    async fn stream_chat_completion(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
        on_chunk: &mut ChunkHandler<'_>,
    ) -> Result<TokenUsage, StreamError> {
        let request = self.request(self.stream_url(), prompt);
        let response = http::send(PROVIDER, cancel, request).await?;

        // Gemini has no terminator event; the stream ends with the body.
        let mut usage = TokenUsage::default();
        sse::drive(PROVIDER, cancel, response, |event| {
            if event.data.trim().is_empty() {
                return Ok(Flow::Continue);
            }
            let chunk: GenerateResponse =
                serde_json::from_str(&event.data).map_err(|e| StreamError::Malformed {
                    provider: PROVIDER,
                    reason: e.to_string(),
                })?;
            if let Some(error) = chunk.error {
                return Err(StreamError::Upstream {
                    provider: PROVIDER,
                    message: error.message,
                });
            }
            if let Some(u) = &chunk.usage_metadata {
                usage.merge(&u.partial());
            }
            if let Some(text) = chunk.text().filter(|t| !t.is_empty()) {
                on_chunk(&text).map_err(StreamError::Handler)?;
            }
            Ok(Flow::Continue)
        })
        .await?;

        Ok(usage.with_derived_total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> GeminiClient {
        let cfg = ClientConfig {
            base_url: base_url.to_string(),
            api_key: "key".into(),
            model: "gemini-2.0-flash".into(),
            max_tokens: 100,
            temperature: 0.5,
            top_p: 0.9,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
        };
        GeminiClient::new(cfg, reqwest::Client::new())
    }

    #[test]
    fn test_urls() {
        let c = client("");
        assert_eq!(
            c.generate_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert!(c.stream_url().ends_with(":streamGenerateContent?alt=sse"));
    }

    #[test]
    fn test_request_body_shape() {
        let c = client("http://localhost");
        let request = c.request(c.generate_url(), "hello").build().unwrap();
        assert_eq!(request.headers()["x-goog-api-key"], "key");
        let body: serde_json::Value =
            serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], SYSTEM_PROMPT);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 100);
    }

    #[test]
    fn test_text_skips_thought_parts() {
        let body: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[
                {"text":"thinking...","thought":true},
                {"text":"answer"}]}}],
               "usageMetadata":{"promptTokenCount":3,"candidatesTokenCount":1,
                                "totalTokenCount":9,"thoughtsTokenCount":5}}"#,
        )
        .unwrap();
        assert_eq!(body.text().as_deref(), Some("answer"));
        let usage = body.usage_metadata.unwrap().partial().into_usage();
        assert_eq!(usage.reasoning_tokens, Some(5));
        assert_eq!(usage.total_tokens, 9);
    }
}
