//! Prompt templates and output languages.
//!
//! Templates are Handlebars documents. A user template directory, when
//! configured, is consulted first; the bundled defaults fill in any template
//! the directory does not provide.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use crate::error::PromptError;

pub const CODE_REVIEW_TEMPLATE: &str = "code_review_file_diff.tmpl";
pub const COMMIT_MESSAGE_TEMPLATE: &str = "commit_message.tmpl";
pub const TRANSLATION_TEMPLATE: &str = "translation.tmpl";

// Placeholder names shared by the bundled templates.
pub const FILE_DIFFS: &str = "file_diffs";
pub const OUTPUT_LANGUAGE: &str = "output_language";
pub const OUTPUT_MESSAGE: &str = "output_message";

const BUNDLED: &[(&str, &str)] = &[
    (
        CODE_REVIEW_TEMPLATE,
        include_str!("../../templates/code_review_file_diff.tmpl"),
    ),
    (
        COMMIT_MESSAGE_TEMPLATE,
        include_str!("../../templates/commit_message.tmpl"),
    ),
    (
        TRANSLATION_TEMPLATE,
        include_str!("../../templates/translation.tmpl"),
    ),
];

pub const DEFAULT_LANGUAGE: &str = "English";

/// Supported output language codes and their names.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("en", DEFAULT_LANGUAGE),
    ("zh-tw", "Traditional Chinese"),
    ("zh-cn", "Simplified Chinese"),
    ("ja", "Japanese"),
];

pub fn is_supported_language(code: &str) -> bool {
    LANGUAGES.iter().any(|(c, _)| *c == code)
}

/// Language name for `code`, or English for anything unrecognized.
pub fn get_language(code: &str) -> &'static str {
    LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or(DEFAULT_LANGUAGE)
}

/// Renders prompt templates by name.
#[derive(Debug, Clone, Default)]
pub struct PromptRenderer {
    template_dir: Option<PathBuf>,
}

impl PromptRenderer {
    /// A renderer that only uses the bundled templates.
    pub fn bundled() -> Self {
        Self::default()
    }

    /// A renderer that prefers templates found in `dir`.
    pub fn with_template_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: Some(dir.into()),
        }
    }

    /// Build from an optional directory; `None` means bundled only.
    pub fn new(template_dir: Option<PathBuf>) -> Self {
        Self { template_dir }
    }

    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, PromptError> {
        let source = self.load(name)?;

        let mut registry = Handlebars::new();
        // Prompts are plain text, diffs must reach the model unescaped.
        registry.register_escape_fn(handlebars::no_escape);

        registry
            .render_template(&source, data)
            .map_err(|e| PromptError::Render {
                name: name.to_string(),
                source: Box::new(e),
            })
    }

    /// Prompt asking the model to translate `message` into `language`.
    pub fn translation(&self, language: &str, message: &str) -> Result<String, PromptError> {
        self.render(
            TRANSLATION_TEMPLATE,
            &serde_json::json!({
                OUTPUT_LANGUAGE: language,
                OUTPUT_MESSAGE: message,
            }),
        )
    }

    fn load(&self, name: &str) -> Result<String, PromptError> {
        if let Some(dir) = &self.template_dir {
            if let Some(content) = read_custom_template(dir, name)? {
                debug!("Using custom template {} from {}", name, dir.display());
                return Ok(content);
            }
        }

        BUNDLED
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, content)| content.to_string())
            .ok_or_else(|| PromptError::UnknownTemplate(name.to_string()))
    }
}

/// Read `name` from `dir`. `Ok(None)` when the file does not exist.
fn read_custom_template(dir: &Path, name: &str) -> Result<Option<String>, PromptError> {
    let relative = Path::new(name);
    let stays_inside = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !stays_inside {
        return Err(PromptError::PathTraversal(dir.join(relative)));
    }

    let path = dir.join(relative);
    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PromptError::Read { path, source }),
    }
}
