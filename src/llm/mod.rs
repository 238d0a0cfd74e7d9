//! Provider-agnostic text generation.
//!
//! Every supported LLM service is adapted to the [`TextGenerator`] trait so
//! the review and commit workflows never need to know which one is in use.

pub mod anthropic;
pub mod factory;
pub mod gemini;
pub(crate) mod http;
pub mod openai;
pub(crate) mod sse;
pub mod usage;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{BoxError, ConfigError, ProviderError, StreamError};

pub use factory::get_client;
pub use usage::{PartialUsage, TokenUsage};

/// Fixed system instruction sent with every request.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Callback receiving streamed text fragments in arrival order.
pub type ChunkHandler<'a> = dyn FnMut(&str) -> Result<(), BoxError> + Send + 'a;

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Anthropic,
    DeepSeek,
    Gemini,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::OpenAi,
        Provider::Anthropic,
        Provider::DeepSeek,
        Provider::Gemini,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::DeepSeek => "deepseek",
            Provider::Gemini => "gemini",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| ConfigError::UnsupportedProvider(s.to_string()))
    }
}

/// Per-provider request settings, projected from the application config.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
}

impl ClientConfig {
    /// `base_url` without a trailing slash, or `default` when unset.
    pub(crate) fn base_url_or(&self, default: &str) -> String {
        let base = self.base_url.trim();
        let base = if base.is_empty() { default } else { base };
        base.trim_end_matches('/').to_string()
    }
}

/// One complete model turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub text: String,
    pub usage: TokenUsage,
}

/// The two operations every provider client exposes.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send `prompt` as a single user turn and wait for the full reply.
    async fn chat_completion(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
    ) -> Result<Response, ProviderError>;

    /// Stream the reply to `on_chunk` fragment by fragment.
    ///
    /// Stops at the first handler error. Returns the usage accumulated over
    /// the whole stream once the provider signals the end.
    async fn stream_chat_completion(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
        on_chunk: &mut ChunkHandler<'_>,
    ) -> Result<TokenUsage, StreamError>;
}
