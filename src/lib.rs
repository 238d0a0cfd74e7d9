//! reviewbot - generate git commit messages and code reviews with an LLM.
//!
//! # Overview
//!
//! reviewbot sends a git diff to one of several LLM providers (OpenAI,
//! DeepSeek, Anthropic, Gemini) behind a single [`llm::TextGenerator`]
//! interface. Configuration is layered from built-in defaults, a YAML file,
//! `REVIEWBOT_*` environment variables and command-line flags.

pub mod cli;
pub mod commit;
pub mod config;
pub mod error;
pub mod git;
pub mod llm;
pub mod progress;
pub mod prompt;
pub mod review;
pub mod transport;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{
    ClientError, CommitError, ConfigError, GitError, InputError, PromptError, ProviderError,
    ReviewError, StreamError, TransportError,
};
pub use git::GitCommand;
pub use llm::{Provider, Response, TextGenerator, TokenUsage, get_client};
pub use prompt::PromptRenderer;
