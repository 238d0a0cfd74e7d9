//! Interactive and printing helpers behind the `init` and `config` commands.

use std::path::Path;

use colored::Colorize;
use dialoguer::{Confirm, Input, Password, Select};

use crate::config::file::{list_entries, write_config};
use crate::config::AppConfig;
use crate::error::{BoxError, ConfigError};
use crate::llm::Provider;
use crate::prompt::LANGUAGES;

/// Answers collected by the `init` questionnaire.
#[derive(Debug, Clone, PartialEq)]
pub struct InitAnswers {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub lang: String,
    pub proxy_url: String,
    pub socks_url: String,
    pub timeout: i64,
    pub skip_verify: bool,
}

/// Suggested model for a freshly initialized provider.
pub fn default_model(provider: Provider) -> &'static str {
    match provider {
        Provider::OpenAi => "gpt-4o-mini",
        Provider::Anthropic => "claude-3-5-haiku-latest",
        Provider::DeepSeek => "deepseek-chat",
        Provider::Gemini => "gemini-2.0-flash",
    }
}

/// Ask the `init` questions on the terminal.
pub fn ask_init_answers(current: &AppConfig) -> Result<InitAnswers, BoxError> {
    let providers: Vec<&str> = Provider::ALL.iter().map(|p| p.as_str()).collect();
    let current_provider = providers
        .iter()
        .position(|p| *p == current.ai.provider)
        .unwrap_or(0);
    let index = Select::new()
        .with_prompt("LLM provider")
        .items(&providers)
        .default(current_provider)
        .interact()?;
    let provider = Provider::ALL[index];

    let api_key = Password::new()
        .with_prompt(format!("{} API key", provider))
        .interact()?;

    let model: String = Input::new()
        .with_prompt("Model")
        .default(default_model(provider).to_string())
        .interact_text()?;

    let base_url: String = Input::new()
        .with_prompt("Base URL (empty for the provider default)")
        .default(current.ai.base_url.clone())
        .allow_empty(true)
        .interact_text()?;

    let language_items: Vec<String> = LANGUAGES
        .iter()
        .map(|(code, name)| format!("{} ({})", name, code))
        .collect();
    let current_lang = LANGUAGES
        .iter()
        .position(|(code, _)| *code == current.git.lang)
        .unwrap_or(0);
    let lang_index = Select::new()
        .with_prompt("Output language")
        .items(&language_items)
        .default(current_lang)
        .interact()?;
    let lang = LANGUAGES[lang_index].0.to_string();

    let proxy_url: String = Input::new()
        .with_prompt("HTTP proxy URL (optional)")
        .default(current.proxy.proxy_url.clone())
        .allow_empty(true)
        .interact_text()?;

    let socks_url: String = Input::new()
        .with_prompt("SOCKS proxy URL (optional)")
        .default(current.proxy.socks_url.clone())
        .allow_empty(true)
        .interact_text()?;

    let timeout: i64 = Input::new()
        .with_prompt("Request timeout in seconds (0 disables)")
        .default(current.proxy.timeout)
        .interact_text()?;

    let skip_verify = Confirm::new()
        .with_prompt("Skip TLS certificate verification?")
        .default(current.proxy.skip_verify)
        .interact()?;

    Ok(InitAnswers {
        provider,
        api_key,
        model,
        base_url,
        lang,
        proxy_url,
        socks_url,
        timeout,
        skip_verify,
    })
}

/// Apply `answers` on top of `base` and validate the result.
pub fn build_init_config(base: &AppConfig, answers: &InitAnswers) -> Result<AppConfig, ConfigError> {
    let mut cfg = base.clone();
    cfg.ai.provider = answers.provider.as_str().to_string();
    cfg.ai.api_key = answers.api_key.trim().to_string();
    cfg.ai.model = answers.model.trim().to_string();
    cfg.ai.base_url = answers.base_url.trim().to_string();
    cfg.git.lang = answers.lang.clone();
    cfg.proxy.proxy_url = answers.proxy_url.trim().to_string();
    cfg.proxy.socks_url = answers.socks_url.trim().to_string();
    cfg.proxy.timeout = answers.timeout;
    cfg.proxy.skip_verify = answers.skip_verify;

    cfg.validate()?;
    Ok(cfg)
}

/// Validate and write an `init` result to `path`.
pub fn save_init_config(path: &Path, base: &AppConfig, answers: &InitAnswers) -> Result<AppConfig, ConfigError> {
    let cfg = build_init_config(base, answers)?;
    write_config(path, &cfg)?;
    Ok(cfg)
}

/// `key = value` lines for `config list`, secrets masked.
pub fn format_config_list(cfg: &AppConfig) -> Result<Vec<String>, ConfigError> {
    Ok(list_entries(cfg)?
        .into_iter()
        .map(|(key, value)| format!("{} = {}", key.cyan(), value))
        .collect())
}
