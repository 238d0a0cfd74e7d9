//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use async_trait::async_trait;
use reviewbot::config::GitOptions;
use reviewbot::error::{ProviderError, StreamError};
use reviewbot::llm::{ChunkHandler, ClientConfig, Response, TextGenerator, TokenUsage};
use tokio_util::sync::CancellationToken;

/// Provider settings pointing at a mock server.
pub fn client_config(base_url: &str) -> ClientConfig {
    ClientConfig {
        base_url: base_url.to_string(),
        api_key: "test-key".into(),
        model: "test-model".into(),
        max_tokens: 256,
        temperature: 0.7,
        top_p: 1.0,
        presence_penalty: 0.0,
        frequency_penalty: 0.0,
    }
}

/// An SSE body made of one `data:` frame per payload.
pub fn sse_body(payloads: &[&str]) -> String {
    payloads
        .iter()
        .map(|p| format!("data: {}\n\n", p))
        .collect()
}

/// Default diff settings for tests.
pub fn git_options() -> GitOptions {
    GitOptions {
        diff_unified: 3,
        exclude_list: Vec::new(),
        amend: false,
    }
}

/// A throwaway git repository driven through the git CLI.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
}

impl TestRepo {
    /// Create a new empty git repository in a temp directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Self { dir };
        repo.git(&["init", "--quiet"]);
        repo.git(&["config", "user.name", "Test User"]);
        repo.git(&["config", "user.email", "test@example.com"]);
        repo.git(&["config", "commit.gpgsign", "false"]);
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Run git in the repository, panicking on failure. Returns trimmed stdout.
    pub fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.dir.path())
            .output()
            .expect("Failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Write `content` to `name` inside the repository.
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, content).expect("Failed to write test file");
        path
    }

    /// Write and stage a file.
    pub fn stage_file(&self, name: &str, content: &str) {
        self.write_file(name, content);
        self.git(&["add", name]);
    }

    /// Subject line of the latest commit.
    pub fn last_subject(&self) -> String {
        self.git(&["log", "-1", "--format=%s"])
    }
}

/// Scripted `TextGenerator`: replies with queued texts and records prompts.
/// Streaming delivers each reply word by word.
pub struct FakeGenerator {
    replies: Mutex<VecDeque<String>>,
    pub prompts: Mutex<Vec<String>>,
    usage: TokenUsage,
}

impl FakeGenerator {
    pub fn new(replies: &[&str], usage: TokenUsage) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
            usage,
        }
    }

    fn next(&self, prompt: &str) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: "fake",
                reason: "no scripted reply left".into(),
            })
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn chat_completion(
        &self,
        _cancel: &CancellationToken,
        prompt: &str,
    ) -> Result<Response, ProviderError> {
        Ok(Response {
            text: self.next(prompt)?,
            usage: self.usage,
        })
    }

    async fn stream_chat_completion(
        &self,
        _cancel: &CancellationToken,
        prompt: &str,
        on_chunk: &mut ChunkHandler<'_>,
    ) -> Result<TokenUsage, StreamError> {
        let reply = self.next(prompt)?;
        for word in reply.split_inclusive(' ') {
            on_chunk(word).map_err(StreamError::Handler)?;
        }
        Ok(self.usage)
    }
}
