//! Error types for reviewbot modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed error returned by streaming chunk handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A single failed validation rule.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("diff_unified must be >= 0")]
    NegativeDiffUnified,

    #[error("max_input_size must be > 0")]
    NonPositiveMaxInputSize,

    #[error("max_input_size must be >= 0")]
    NegativeMaxInputSize,

    #[error("invalid language: {0}")]
    InvalidLanguage(String),

    #[error("provider cannot be empty")]
    EmptyProvider,

    #[error("api_key cannot be empty")]
    EmptyApiKey,

    #[error("max_tokens must be > 0")]
    NonPositiveMaxTokens,

    #[error("temperature must be between 0 and 1, got {0}")]
    TemperatureOutOfRange(f64),

    #[error("top_p must be between 0 and 1, got {0}")]
    TopPOutOfRange(f64),

    #[error("proxy_url invalid: {0}")]
    InvalidProxyUrl(String),

    #[error("socks_url invalid: {0}")]
    InvalidSocksUrl(String),

    #[error("timeout must be >= 0")]
    NegativeTimeout,

    #[error("mode must be local or external, got '{0}'")]
    InvalidMode(String),
}

/// Errors from loading, validating or persisting configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{section}: {reason}")]
    Invalid {
        section: &'static str,
        #[source]
        reason: ValidationError,
    },

    #[error("unsupported LLM provider: '{0}'")]
    UnsupportedProvider(String),

    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to load configuration: {0}")]
    Load(#[source] config::ConfigError),

    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode configuration as YAML: {0}")]
    Yaml(#[source] serde_yaml::Error),

    #[error("unknown config key '{0}'")]
    UnknownKey(String),

    #[error("invalid value '{value}' for config key '{key}': expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("could not determine the user config directory")]
    NoConfigDir,
}

impl ConfigError {
    pub(crate) fn invalid(section: &'static str, reason: ValidationError) -> Self {
        ConfigError::Invalid { section, reason }
    }
}

/// Errors from building the shared HTTP client.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("invalid proxy URL '{url}': {reason}")]
    InvalidProxyUrl { url: String, reason: String },

    #[error("invalid SOCKS URL '{url}': {reason}")]
    InvalidSocksUrl { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

/// Errors from a single upstream LLM call.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider} request failed: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} API returned {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} returned an invalid response: {reason}")]
    InvalidResponse {
        provider: &'static str,
        reason: String,
    },

    #[error("{provider} request was cancelled")]
    Cancelled { provider: &'static str },
}

/// Errors surfaced while a streamed completion is in flight.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("{provider} stream reported an error: {message}")]
    Upstream {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} stream transport failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} sent a malformed stream event: {reason}")]
    Malformed {
        provider: &'static str,
        reason: String,
    },

    #[error("chunk handler failed: {0}")]
    Handler(#[source] BoxError),

    #[error("{provider} stream was cancelled")]
    Cancelled { provider: &'static str },
}

/// Errors from obtaining a provider client.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors from reading the diff that is about to be sent to a provider.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("please provide the diff content to review")]
    Empty,

    #[error("git diff input size exceeds limit ({size} bytes, limit {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },

    #[error("Failed to read diff input from {source_name}: {source}")]
    Read {
        source_name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the git subprocess wrapper.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("git not found in PATH. Install git to use reviewbot")]
    NotInstalled,

    #[error("Failed to spawn git: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("git {args}: {stderr}")]
    CommandFailed { args: String, stderr: String },

    #[error("please add your staged changes using git add <files...>")]
    NothingStaged,

    #[error("no paths provided to git add")]
    NoPaths,
}

/// Errors from prompt template rendering.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("unknown prompt template '{0}'")]
    UnknownTemplate(String),

    #[error("template path escapes the template directory: {}", .0.display())]
    PathTraversal(PathBuf),

    #[error("Failed to read template {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render template '{name}': {source}")]
    Render {
        name: String,
        #[source]
        source: Box<handlebars::RenderError>,
    },
}

/// Errors from the review workflow.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("Failed to write review output: {0}")]
    Output(#[from] std::io::Error),
}

/// Errors from the commit workflow.
#[derive(Error, Debug)]
pub enum CommitError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("the provider returned an empty commit message")]
    EmptyMessage,

    #[error("Failed to read confirmation: {0}")]
    Confirm(#[source] BoxError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_is_prefixed_with_section() {
        let err = ConfigError::invalid("ai", ValidationError::EmptyProvider);
        assert_eq!(err.to_string(), "ai: provider cannot be empty");
    }

    #[test]
    fn test_unsupported_provider_names_value() {
        let err = ConfigError::UnsupportedProvider("unsupported".into());
        let msg = err.to_string();
        assert!(msg.contains("unsupported"));
        assert!(msg.contains("'unsupported'"));
    }

    #[test]
    fn test_git_error_carries_stderr() {
        let err = GitError::CommandFailed {
            args: "diff --staged".into(),
            stderr: "fatal: not a git repository".into(),
        };
        assert_eq!(
            err.to_string(),
            "git diff --staged: fatal: not a git repository"
        );
    }
}
