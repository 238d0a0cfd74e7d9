//! The `review` workflow: collect a diff, ask the model for a review and
//! print it, translating when a non-English output language is configured.

use std::fs::File;
use std::io::{IsTerminal, Read, Write};
use std::path::Path;

use colored::Colorize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{ReviewMode, ReviewSettings};
use crate::error::{BoxError, InputError, ReviewError};
use crate::git::GitCommand;
use crate::llm::{TextGenerator, TokenUsage};
use crate::progress::with_spinner;
use crate::prompt::{CODE_REVIEW_TEMPLATE, DEFAULT_LANGUAGE, FILE_DIFFS, PromptRenderer, get_language};

/// What a review produced: the final text shown to the user and the usage of
/// every provider call, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub summary: String,
    pub usage: Vec<TokenUsage>,
}

/// Collect the diff to review according to the configured mode.
///
/// External mode reads the positional argument, else the diff file, else
/// piped stdin.
pub fn collect_diff(
    settings: &ReviewSettings,
    git: &GitCommand,
    arg: Option<&str>,
) -> Result<String, ReviewError> {
    match settings.mode {
        ReviewMode::Local => Ok(git.diff_files()?),
        ReviewMode::External => {
            let stdin = std::io::stdin();
            let piped = (!stdin.is_terminal()).then(|| stdin.lock());
            let diff = read_external_diff(
                arg,
                settings.diff_file.as_deref(),
                piped,
                settings.max_input_size,
            )?;
            Ok(diff)
        }
    }
}

/// Read an externally supplied diff, enforcing the size ceiling.
///
/// Any input of `limit` bytes or more is rejected, as is empty input.
pub fn read_external_diff<R: Read>(
    arg: Option<&str>,
    diff_file: Option<&Path>,
    stdin: Option<R>,
    limit: u64,
) -> Result<String, InputError> {
    let diff = if let Some(arg) = arg {
        check_size(arg.len() as u64, limit)?;
        arg.to_string()
    } else if let Some(path) = diff_file {
        read_diff_file(path, limit)?
    } else if let Some(reader) = stdin {
        read_limited(reader, limit, "stdin")?
    } else {
        String::new()
    };

    if diff.trim().is_empty() {
        return Err(InputError::Empty);
    }
    debug!("Read {} bytes of external diff", diff.len());
    Ok(diff)
}

fn check_size(size: u64, limit: u64) -> Result<(), InputError> {
    if size >= limit {
        return Err(InputError::TooLarge { size, limit });
    }
    Ok(())
}

fn read_diff_file(path: &Path, limit: u64) -> Result<String, InputError> {
    let source_name = path.display().to_string();
    let read_err = |source| InputError::Read {
        source_name: source_name.clone(),
        source,
    };

    let file = File::open(path).map_err(read_err)?;
    let size = file.metadata().map_err(read_err)?.len();
    check_size(size, limit)?;
    read_limited(file, limit, &source_name)
}

fn read_limited<R: Read>(reader: R, limit: u64, source_name: &str) -> Result<String, InputError> {
    let mut buf = Vec::new();
    reader
        .take(limit)
        .read_to_end(&mut buf)
        .map_err(|source| InputError::Read {
            source_name: source_name.to_string(),
            source,
        })?;
    check_size(buf.len() as u64, limit)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Run a review of `diff` and write the result to `out`.
pub async fn run_review(
    generator: &dyn TextGenerator,
    renderer: &PromptRenderer,
    cancel: &CancellationToken,
    diff: &str,
    settings: &ReviewSettings,
    out: &mut (dyn Write + Send),
) -> Result<ReviewOutcome, ReviewError> {
    let prompt = renderer.render(CODE_REVIEW_TEMPLATE, &json!({ FILE_DIFFS: diff }))?;
    let language = get_language(&settings.output_lang);

    writeln!(out, "{}", "We are trying to review code changes".cyan())?;

    if settings.stream {
        stream_review(generator, renderer, cancel, &prompt, language, out).await
    } else {
        complete_review(generator, renderer, cancel, &prompt, language, out).await
    }
}

async fn complete_review(
    generator: &dyn TextGenerator,
    renderer: &PromptRenderer,
    cancel: &CancellationToken,
    prompt: &str,
    language: &str,
    out: &mut (dyn Write + Send),
) -> Result<ReviewOutcome, ReviewError> {
    let mut usage = Vec::new();

    let response = with_spinner(
        "Analyzing code changes...",
        "Code analysis completed",
        "Failed to analyze code changes",
        generator.chat_completion(cancel, prompt),
    )
    .await?;
    writeln!(out, "{}", response.usage.to_string().magenta())?;
    usage.push(response.usage);
    let mut summary = response.text;

    if language != DEFAULT_LANGUAGE {
        let instruction = renderer.translation(language, &summary)?;
        writeln!(
            out,
            "{}",
            format!("We are trying to translate the code review summary to {}", language).cyan()
        )?;
        let translated = with_spinner(
            "Translating review summary...",
            "Translation completed",
            "Failed to translate review summary",
            generator.chat_completion(cancel, &instruction),
        )
        .await?;
        writeln!(out, "{}", translated.usage.to_string().magenta())?;
        usage.push(translated.usage);
        summary = translated.text;
    }

    let summary = summary.trim().to_string();
    writeln!(out, "{}", "================Review Summary====================".yellow())?;
    writeln!(out, "\n{}\n", summary.yellow())?;
    writeln!(out, "{}", "==================================================".yellow())?;

    Ok(ReviewOutcome { summary, usage })
}

async fn stream_review(
    generator: &dyn TextGenerator,
    renderer: &PromptRenderer,
    cancel: &CancellationToken,
    prompt: &str,
    language: &str,
    out: &mut (dyn Write + Send),
) -> Result<ReviewOutcome, ReviewError> {
    let mut usage = Vec::new();

    // Translation needs the whole review, so only the translation streams.
    let streamed_prompt = if language == DEFAULT_LANGUAGE {
        prompt.to_string()
    } else {
        let response = generator.chat_completion(cancel, prompt).await?;
        writeln!(out, "{}", response.usage.to_string().magenta())?;
        usage.push(response.usage);
        writeln!(
            out,
            "{}",
            format!(
                "We are trying to translate the code review summary to {} in streaming mode",
                language
            )
            .cyan()
        )?;
        renderer.translation(language, &response.text)?
    };

    let mut summary = String::new();
    let mut on_chunk = |chunk: &str| -> Result<(), BoxError> {
        write!(out, "{}", chunk.yellow())?;
        out.flush()?;
        summary.push_str(chunk);
        Ok(())
    };
    let stream_usage = generator
        .stream_chat_completion(cancel, &streamed_prompt, &mut on_chunk)
        .await?;

    writeln!(out)?;
    writeln!(out, "{}", stream_usage.to_string().magenta())?;
    usage.push(stream_usage);

    Ok(ReviewOutcome { summary, usage })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const NO_STDIN: Option<Cursor<Vec<u8>>> = None;

    #[test]
    fn test_argument_wins_over_file_and_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("change.diff");
        std::fs::write(&file, "from file").unwrap();

        let diff = read_external_diff(
            Some("from arg"),
            Some(&file),
            Some(Cursor::new(b"from stdin".to_vec())),
            1024,
        )
        .unwrap();
        assert_eq!(diff, "from arg");

        let diff = read_external_diff(None, Some(&file), NO_STDIN, 1024).unwrap();
        assert_eq!(diff, "from file");

        let diff =
            read_external_diff(None, None, Some(Cursor::new(b"from stdin".to_vec())), 1024).unwrap();
        assert_eq!(diff, "from stdin");
    }

    #[test]
    fn test_size_limit_is_exclusive() {
        let err = read_external_diff(Some("abcd"), None, NO_STDIN, 4).unwrap_err();
        assert!(matches!(err, InputError::TooLarge { size: 4, limit: 4 }));
        assert_eq!(read_external_diff(Some("abc"), None, NO_STDIN, 4).unwrap(), "abc");

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.diff");
        std::fs::write(&file, "0123456789").unwrap();
        let err = read_external_diff(None, Some(&file), NO_STDIN, 10).unwrap_err();
        assert!(matches!(err, InputError::TooLarge { size: 10, .. }));

        let err = read_external_diff(None, None, Some(Cursor::new(vec![b'x'; 64])), 10).unwrap_err();
        assert!(matches!(err, InputError::TooLarge { .. }));
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = read_external_diff(None, None, NO_STDIN, 1024).unwrap_err();
        assert!(matches!(err, InputError::Empty));
        assert_eq!(err.to_string(), "please provide the diff content to review");

        let err = read_external_diff(Some("  \n"), None, NO_STDIN, 1024).unwrap_err();
        assert!(matches!(err, InputError::Empty));
    }

    #[test]
    fn test_missing_diff_file_is_read_error() {
        let err = read_external_diff(None, Some(Path::new("/nonexistent/x.diff")), NO_STDIN, 1024)
            .unwrap_err();
        assert!(matches!(err, InputError::Read { .. }));
    }
}
