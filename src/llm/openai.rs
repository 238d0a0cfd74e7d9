//! OpenAI-compatible chat completions client (OpenAI, DeepSeek).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ProviderError, StreamError};

use super::sse::{self, Flow};
use super::{ChunkHandler, ClientConfig, PartialUsage, Response, SYSTEM_PROMPT, TextGenerator, TokenUsage, http};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";

/// Data payload that terminates an OpenAI stream.
const DONE_MARKER: &str = "[DONE]";

/// Client for any service speaking the OpenAI chat completions API.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    config: ClientConfig,
    endpoint: String,
    provider: &'static str,
}

impl OpenAiClient {
    pub fn new(config: ClientConfig, http: reqwest::Client) -> Self {
        Self::with_default_base("openai", DEFAULT_OPENAI_BASE_URL, config, http)
    }

    /// DeepSeek is the same API under a different default base URL.
    pub fn deepseek(config: ClientConfig, http: reqwest::Client) -> Self {
        Self::with_default_base("deepseek", DEFAULT_DEEPSEEK_BASE_URL, config, http)
    }

    fn with_default_base(
        provider: &'static str,
        default_base: &str,
        config: ClientConfig,
        http: reqwest::Client,
    ) -> Self {
        let endpoint = format!("{}/chat/completions", config.base_url_or(default_base));
        Self {
            http,
            config,
            endpoint,
            provider,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self, prompt: &str, stream: bool) -> reqwest::RequestBuilder {
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            presence_penalty: self.config.presence_penalty,
            frequency_penalty: self.config.frequency_penalty,
            stream,
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
        };
        debug!("POST {} (stream={})", self.endpoint, stream);
        self.http
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    presence_penalty: f32,
    frequency_penalty: f32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    usage: Option<Usage>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
    prompt_tokens_details: Option<PromptTokensDetails>,
    completion_tokens_details: Option<CompletionTokensDetails>,
}

#[derive(Deserialize)]
struct PromptTokensDetails {
    cached_tokens: Option<u64>,
}

#[derive(Deserialize)]
struct CompletionTokensDetails {
    reasoning_tokens: Option<u64>,
}

impl Usage {
    fn partial(&self) -> PartialUsage {
        PartialUsage {
            prompt_tokens: self.prompt_tokens,
            completion_tokens: self.completion_tokens,
            total_tokens: self.total_tokens,
            cached_tokens: self
                .prompt_tokens_details
                .as_ref()
                .and_then(|d| d.cached_tokens),
            reasoning_tokens: self
                .completion_tokens_details
                .as_ref()
                .and_then(|d| d.reasoning_tokens),
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn chat_completion(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
    ) -> Result<Response, ProviderError> {
        let provider = self.provider;
        let response = http::send(provider, cancel, self.request(prompt, false)).await?;
        let body: ChatResponse = http::read_json(provider, cancel, response).await?;

        let text = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider,
                reason: "response contained no choices".to_string(),
            })?;
        let usage = body
            .usage
            .map(|u| u.partial().into_usage())
            .unwrap_or_default();

        Ok(Response { text, usage })
    }

    async fn stream_chat_completion(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
        on_chunk: &mut ChunkHandler<'_>,
    ) -> Result<TokenUsage, StreamError> {
        let provider = self.provider;
        let response = http::send(provider, cancel, self.request(prompt, true)).await?;

        let mut usage = TokenUsage::default();
        sse::drive(provider, cancel, response, |event| {
            let data = event.data.trim();
            if data == DONE_MARKER {
                return Ok(Flow::Done);
            }
            if data.is_empty() {
                return Ok(Flow::Continue);
            }

            let chunk: ChatChunk =
                serde_json::from_str(data).map_err(|e| StreamError::Malformed {
                    provider,
                    reason: e.to_string(),
                })?;
            if let Some(error) = chunk.error {
                return Err(StreamError::Upstream {
                    provider,
                    message: error.message,
                });
            }
            if let Some(u) = &chunk.usage {
                usage.merge(&u.partial());
            }
            for choice in &chunk.choices {
                if let Some(text) = choice.delta.content.as_deref().filter(|t| !t.is_empty()) {
                    on_chunk(text).map_err(StreamError::Handler)?;
                }
            }
            Ok(Flow::Continue)
        })
        .await?;

        Ok(usage)
    }
}
