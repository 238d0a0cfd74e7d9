//! Narrow views of `AppConfig` handed to each consumer.

use std::path::PathBuf;
use std::time::Duration;

use crate::llm::ClientConfig;
use crate::transport::TransportConfig;

use super::AppConfig;

/// Settings for the git subprocess wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOptions {
    pub diff_unified: u32,
    pub exclude_list: Vec<String>,
    pub amend: bool,
}

/// Where the review command reads its diff from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewMode {
    /// Staged changes of the current repository.
    Local,
    /// An argument, a file or piped stdin.
    External,
}

/// Effective review settings after falling back to `git.*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSettings {
    pub mode: ReviewMode,
    pub stream: bool,
    pub diff_file: Option<PathBuf>,
    pub max_input_size: u64,
    pub output_lang: String,
}

/// Effective commit settings after falling back to `git.*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSettings {
    pub preview: bool,
    pub auto_stage: bool,
    pub output_lang: String,
}

impl AppConfig {
    pub fn client_config(&self) -> ClientConfig {
        let ai = &self.ai;
        ClientConfig {
            base_url: ai.base_url.trim().to_string(),
            api_key: ai.api_key.trim().to_string(),
            model: ai.model.trim().to_string(),
            max_tokens: u32::try_from(ai.max_tokens).unwrap_or(u32::MAX),
            temperature: ai.temperature as f32,
            top_p: ai.top_p as f32,
            presence_penalty: ai.presence_penalty as f32,
            frequency_penalty: ai.frequency_penalty as f32,
        }
    }

    pub fn transport_config(&self) -> TransportConfig {
        let proxy = &self.proxy;
        TransportConfig {
            proxy_url: proxy.proxy_url.trim().to_string(),
            socks_url: proxy.socks_url.trim().to_string(),
            timeout: Duration::from_secs(u64::try_from(proxy.timeout).unwrap_or(0)),
            headers: proxy.headers.clone(),
            skip_verify: proxy.skip_verify,
        }
    }

    pub fn git_options(&self) -> GitOptions {
        GitOptions {
            diff_unified: u32::try_from(self.git.diff_unified).unwrap_or(0),
            exclude_list: self.git.exclude_list.clone(),
            amend: self.git.amend,
        }
    }

    pub fn review_settings(&self) -> ReviewSettings {
        let review = &self.runtime.review;
        let mode = match review.mode.trim() {
            "external" => ReviewMode::External,
            _ => ReviewMode::Local,
        };
        let max_input_size = if review.max_input_size > 0 {
            review.max_input_size
        } else {
            self.git.max_input_size
        };
        ReviewSettings {
            mode,
            stream: review.stream,
            diff_file: non_empty(&review.diff_file)
                .or_else(|| non_empty(&self.git.diff_file))
                .map(PathBuf::from),
            max_input_size: u64::try_from(max_input_size).unwrap_or(0),
            output_lang: non_empty(&review.output_lang)
                .unwrap_or_else(|| self.git.lang.trim().to_string()),
        }
    }

    pub fn commit_settings(&self) -> CommitSettings {
        let commit = &self.runtime.commit;
        CommitSettings {
            preview: commit.preview,
            auto_stage: commit.auto_stage,
            output_lang: non_empty(&commit.output_lang)
                .unwrap_or_else(|| self.git.lang.trim().to_string()),
        }
    }

    /// Custom template directory, if configured.
    pub fn template_dir(&self) -> Option<PathBuf> {
        non_empty(&self.prompt.folder).map(PathBuf::from)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
