//! The `commit` workflow: draft a commit message from the staged diff, show
//! it, and commit once the user agrees.

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::CommitSettings;
use crate::error::{BoxError, CommitError, GitError};
use crate::git::GitCommand;
use crate::llm::{TextGenerator, TokenUsage};
use crate::prompt::{COMMIT_MESSAGE_TEMPLATE, DEFAULT_LANGUAGE, FILE_DIFFS, PromptRenderer, get_language};

/// A generated commit message and the usage of the calls that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitDraft {
    pub message: String,
    pub usage: Vec<TokenUsage>,
}

/// Asks the user a yes/no question.
#[cfg_attr(test, mockall::automock)]
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> Result<bool, BoxError>;
}

/// Records a commit with the given message.
#[cfg_attr(test, mockall::automock)]
pub trait CommitSink {
    fn commit(&self, message: &str) -> Result<String, GitError>;
}

impl CommitSink for GitCommand {
    fn commit(&self, message: &str) -> Result<String, GitError> {
        GitCommand::commit(self, message)
    }
}

/// Interactive confirmation on the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> Result<bool, BoxError> {
        let answer = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?;
        Ok(answer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Git's output for the new commit.
    Committed(String),
    Declined,
}

/// Stage (optionally), diff and ask the model for a commit message.
pub async fn draft_commit_message(
    generator: &dyn TextGenerator,
    renderer: &PromptRenderer,
    cancel: &CancellationToken,
    git: &GitCommand,
    settings: &CommitSettings,
) -> Result<CommitDraft, CommitError> {
    if settings.auto_stage {
        debug!("Staging all changes");
        git.add(&["."])?;
    }
    let diff = git.diff_files()?;

    let prompt = renderer.render(COMMIT_MESSAGE_TEMPLATE, &json!({ FILE_DIFFS: diff }))?;
    let response = generator.chat_completion(cancel, &prompt).await?;
    let mut usage = vec![response.usage];
    let mut message = response.text;

    let language = get_language(&settings.output_lang);
    if language != DEFAULT_LANGUAGE {
        let instruction = renderer.translation(language, &message)?;
        let translated = generator.chat_completion(cancel, &instruction).await?;
        usage.push(translated.usage);
        message = translated.text;
    }

    let message = unescape_html(&message).trim().to_string();
    if message.is_empty() {
        return Err(CommitError::EmptyMessage);
    }

    Ok(CommitDraft { message, usage })
}

/// Commit `draft`, asking first when `preview` is set.
///
/// Declining is a normal outcome, not an error.
pub fn finalize(
    draft: &CommitDraft,
    preview: bool,
    confirm: &dyn Confirm,
    sink: &dyn CommitSink,
) -> Result<CommitOutcome, CommitError> {
    if preview {
        let accepted = confirm
            .confirm("Commit with this message?")
            .map_err(CommitError::Confirm)?;
        if !accepted {
            return Ok(CommitOutcome::Declined);
        }
    }
    Ok(CommitOutcome::Committed(sink.commit(&draft.message)?))
}

/// Undo the HTML entity escaping models sometimes apply to code symbols.
///
/// Named, decimal and hex entities are all decoded in a single pass, so
/// "&amp;lt;" becomes "&lt;" rather than "<".
pub fn unescape_html(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}
