//! Provider selection: the single place that knows every supported provider.

use tracing::debug;

use crate::config::AppConfig;
use crate::error::ClientError;
use crate::transport::build_transport;

use super::anthropic::AnthropicClient;
use super::gemini::GeminiClient;
use super::openai::OpenAiClient;
use super::{Provider, TextGenerator};

/// Build a ready-to-use client for `provider`.
///
/// No network I/O happens here; connection problems surface on the first call.
pub fn get_client(provider: &str, cfg: &AppConfig) -> Result<Box<dyn TextGenerator>, ClientError> {
    let provider: Provider = provider.parse()?;
    let http = build_transport(&cfg.transport_config())?;
    let client_config = cfg.client_config();
    debug!("Using {} with model {}", provider, client_config.model);

    Ok(match provider {
        Provider::OpenAi => Box::new(OpenAiClient::new(client_config, http)),
        Provider::DeepSeek => Box::new(OpenAiClient::deepseek(client_config, http)),
        Provider::Anthropic => Box::new(AnthropicClient::new(client_config, http)),
        Provider::Gemini => Box::new(GeminiClient::new(client_config, http)),
    })
}
