//! Anthropic Messages API client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ProviderError, StreamError};

use super::sse::{self, Flow};
use super::{ChunkHandler, ClientConfig, PartialUsage, Response, SYSTEM_PROMPT, TextGenerator, TokenUsage, http};

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Value of the `anthropic-version` header.
const API_VERSION: &str = "2023-06-01";

const PROVIDER: &str = "anthropic";

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    config: ClientConfig,
    endpoint: String,
}

impl AnthropicClient {
    pub fn new(config: ClientConfig, http: reqwest::Client) -> Self {
        let endpoint = format!("{}/v1/messages", config.base_url_or(DEFAULT_ANTHROPIC_BASE_URL));
        Self {
            http,
            config,
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    // Presence and frequency penalties have no Messages API equivalent.
    fn request(&self, prompt: &str, stream: bool) -> reqwest::RequestBuilder {
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system: SYSTEM_PROMPT,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            stream,
        };
        debug!("POST {} (stream={})", self.endpoint, stream);
        self.http
            .post(&self.endpoint)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
    cache_creation_input_tokens: Option<u64>,
    cache_read_input_tokens: Option<u64>,
}

impl Usage {
    fn partial(&self) -> PartialUsage {
        let cached = match (self.cache_read_input_tokens, self.cache_creation_input_tokens) {
            (None, None) => None,
            (read, creation) => Some(read.unwrap_or(0) + creation.unwrap_or(0)),
        };
        PartialUsage {
            prompt_tokens: self.input_tokens,
            completion_tokens: self.output_tokens,
            total_tokens: None,
            cached_tokens: cached,
            reasoning_tokens: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    MessageStart {
        message: StartMessage,
    },
    ContentBlockDelta {
        delta: BlockDelta,
    },
    MessageDelta {
        usage: Option<Usage>,
    },
    MessageStop,
    Error {
        error: ApiError,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct StartMessage {
    usage: Option<Usage>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockDelta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

#[async_trait]
impl TextGenerator for AnthropicClient {
    async fn chat_completion(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
    ) -> Result<Response, ProviderError> {
        let response = http::send(PROVIDER, cancel, self.request(prompt, false)).await?;
        let body: MessagesResponse = http::read_json(PROVIDER, cancel, response).await?;

        let texts: Vec<String> = body
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect();
        if texts.is_empty() {
            return Err(ProviderError::InvalidResponse {
                provider: PROVIDER,
                reason: "response contained no text content".to_string(),
            });
        }

        let usage = body
            .usage
            .map(|u| u.partial().into_usage())
            .unwrap_or_default()
            .with_derived_total();

        Ok(Response {
            text: texts.concat(),
            usage,
        })
    }

    async fn stream_chat_completion(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
        on_chunk: &mut ChunkHandler<'_>,
    ) -> Result<TokenUsage, StreamError> {
        let response = http::send(PROVIDER, cancel, self.request(prompt, true)).await?;

        let mut usage = TokenUsage::default();
        sse::drive(PROVIDER, cancel, response, |event| {
            if event.data.trim().is_empty() {
                return Ok(Flow::Continue);
            }
            let parsed: StreamEvent =
                serde_json::from_str(&event.data).map_err(|e| StreamError::Malformed {
                    provider: PROVIDER,
                    reason: e.to_string(),
                })?;

            match parsed {
                StreamEvent::MessageStart { message } => {
                    if let Some(u) = &message.usage {
                        usage.merge(&u.partial());
                    }
                }
                StreamEvent::ContentBlockDelta {
                    delta: BlockDelta::TextDelta { text },
                } => {
                    if !text.is_empty() {
                        on_chunk(&text).map_err(StreamError::Handler)?;
                    }
                }
                StreamEvent::MessageDelta { usage: Some(u) } => usage.merge(&u.partial()),
                StreamEvent::MessageStop => return Ok(Flow::Done),
                StreamEvent::Error { error } => {
                    return Err(StreamError::Upstream {
                        provider: PROVIDER,
                        message: error.message,
                    });
                }
                _ => {}
            }
            Ok(Flow::Continue)
        })
        .await?;

        Ok(usage.with_derived_total())
    }
}
