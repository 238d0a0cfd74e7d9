//! Application configuration: model, layered loading, validation and persistence.
//!
//! Values are resolved lowest to highest precedence from built-in defaults,
//! the YAML config file, `REVIEWBOT_*` environment variables and finally
//! command-line overrides.

pub mod adapter;
pub mod file;
pub mod loader;
pub mod validate;

use serde::{Deserialize, Serialize};

pub use adapter::{CommitSettings, GitOptions, ReviewMode, ReviewSettings};
pub use file::{default_config_dir, default_config_path, ensure_default_config_file, resolve_config_path};
pub use loader::{CommitOverrides, GitOverrides, LoadOptions, Overrides, ReviewOverrides, load, resolve};

/// Base name of the config file, without extension.
pub const CONFIG_NAME: &str = "reviewbot";

/// Config file format and extension.
pub const CONFIG_TYPE: &str = "yaml";

/// Prefix of every environment variable the loader reads.
pub const ENV_PREFIX: &str = "REVIEWBOT";

pub const DEFAULT_DIFF_UNIFIED: i64 = 3;
pub const DEFAULT_MAX_INPUT_SIZE: i64 = 20 * 1024 * 1024;
pub const DEFAULT_LANG: &str = "en";
pub const DEFAULT_TIMEOUT_SECS: i64 = 30;
pub const DEFAULT_PROVIDER: &str = "openai";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_TOKENS: i64 = 1000;

/// Fully resolved application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub git: GitConfig,
    pub ai: AiConfig,
    pub proxy: ProxyConfig,
    pub prompt: PromptConfig,
    pub runtime: RuntimeConfig,
}

/// Options for collecting the diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    pub diff_file: String,
    pub max_input_size: i64,
    pub diff_unified: i64,
    pub exclude_list: Vec<String>,
    pub amend: bool,
    pub lang: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            diff_file: String::new(),
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
            diff_unified: DEFAULT_DIFF_UNIFIED,
            exclude_list: Vec::new(),
            amend: false,
            lang: DEFAULT_LANG.to_string(),
        }
    }
}

/// LLM provider selection and sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub provider: String,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: i64,
    pub temperature: f64,
    pub top_p: f64,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            api_key: String::new(),
            base_url: String::new(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.7,
            top_p: 1.0,
            presence_penalty: 0.5,
            frequency_penalty: 0.5,
        }
    }
}

/// HTTP transport settings. `timeout` is in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub proxy_url: String,
    pub socks_url: String,
    pub timeout: i64,
    pub headers: Vec<String>,
    pub skip_verify: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            proxy_url: String::new(),
            socks_url: String::new(),
            timeout: DEFAULT_TIMEOUT_SECS,
            headers: Vec::new(),
            skip_verify: false,
        }
    }
}

/// Prompt template settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Directory whose templates take precedence over the bundled ones.
    pub folder: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub review: ReviewRuntime,
    pub commit: CommitRuntime,
}

/// Review command settings. Empty or zero values defer to `git.*`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewRuntime {
    pub mode: String,
    pub stream: bool,
    pub diff_file: String,
    pub max_input_size: i64,
    pub output_lang: String,
}

/// Commit command settings. An empty `output_lang` defers to `git.lang`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitRuntime {
    pub preview: bool,
    pub output_lang: String,
    pub auto_stage: bool,
}

/// Value shape of a configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Str,
    Int,
    Float,
    Bool,
    /// Comma-separated in environment variables and `config set`.
    List,
}

impl KeyKind {
    pub fn describe(&self) -> &'static str {
        match self {
            KeyKind::Str => "a string",
            KeyKind::Int => "an integer",
            KeyKind::Float => "a number",
            KeyKind::Bool => "true or false",
            KeyKind::List => "a comma-separated list",
        }
    }
}

/// Every settable configuration key, in display order.
pub const KEYS: &[(&str, KeyKind)] = &[
    ("git.diff_file", KeyKind::Str),
    ("git.max_input_size", KeyKind::Int),
    ("git.diff_unified", KeyKind::Int),
    ("git.exclude_list", KeyKind::List),
    ("git.amend", KeyKind::Bool),
    ("git.lang", KeyKind::Str),
    ("ai.provider", KeyKind::Str),
    ("ai.api_key", KeyKind::Str),
    ("ai.base_url", KeyKind::Str),
    ("ai.model", KeyKind::Str),
    ("ai.max_tokens", KeyKind::Int),
    ("ai.temperature", KeyKind::Float),
    ("ai.top_p", KeyKind::Float),
    ("ai.presence_penalty", KeyKind::Float),
    ("ai.frequency_penalty", KeyKind::Float),
    ("proxy.proxy_url", KeyKind::Str),
    ("proxy.socks_url", KeyKind::Str),
    ("proxy.timeout", KeyKind::Int),
    ("proxy.headers", KeyKind::List),
    ("proxy.skip_verify", KeyKind::Bool),
    ("prompt.folder", KeyKind::Str),
    ("runtime.review.mode", KeyKind::Str),
    ("runtime.review.stream", KeyKind::Bool),
    ("runtime.review.diff_file", KeyKind::Str),
    ("runtime.review.max_input_size", KeyKind::Int),
    ("runtime.review.output_lang", KeyKind::Str),
    ("runtime.commit.preview", KeyKind::Bool),
    ("runtime.commit.output_lang", KeyKind::Str),
    ("runtime.commit.auto_stage", KeyKind::Bool),
];

/// Look up the kind of a known key.
pub fn key_kind(key: &str) -> Option<KeyKind> {
    KEYS.iter().find(|(k, _)| *k == key).map(|(_, kind)| *kind)
}
