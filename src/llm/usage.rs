//! Normalized token accounting shared by every provider.

use std::fmt;

/// Token counts reported for one model call.
///
/// `total_tokens` is whatever the provider reported (or the sum, for
/// providers that omit it); it is not checked against the other fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    /// Prompt-side cache hits.
    pub cached_tokens: Option<u64>,
    /// Completion-side reasoning tokens.
    pub reasoning_tokens: Option<u64>,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64, total_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
            cached_tokens: None,
            reasoning_tokens: None,
        }
    }

    /// Fold a partial usage report into this one.
    ///
    /// Per field, the last non-zero value wins. Providers spread usage over
    /// several stream events and do not repeat fields they already sent, so
    /// a zero or missing field never clears an earlier value.
    pub fn merge(&mut self, partial: &PartialUsage) {
        merge_count(&mut self.prompt_tokens, partial.prompt_tokens);
        merge_count(&mut self.completion_tokens, partial.completion_tokens);
        merge_count(&mut self.total_tokens, partial.total_tokens);
        merge_optional(&mut self.cached_tokens, partial.cached_tokens);
        merge_optional(&mut self.reasoning_tokens, partial.reasoning_tokens);
    }

    /// Fill in `total_tokens` for providers that never report it.
    pub(crate) fn with_derived_total(mut self) -> Self {
        if self.total_tokens == 0 {
            self.total_tokens = self.prompt_tokens + self.completion_tokens;
        }
        self
    }
}

/// Usage fields carried by a single response or stream event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartialUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
    pub cached_tokens: Option<u64>,
    pub reasoning_tokens: Option<u64>,
}

impl PartialUsage {
    pub fn into_usage(self) -> TokenUsage {
        let mut usage = TokenUsage::default();
        usage.merge(&self);
        usage
    }
}

fn merge_count(slot: &mut u64, value: Option<u64>) {
    if let Some(v) = value.filter(|v| *v > 0) {
        *slot = v;
    }
}

fn merge_optional(slot: &mut Option<u64>, value: Option<u64>) {
    if let Some(v) = value.filter(|v| *v > 0) {
        *slot = Some(v);
    }
}

impl fmt::Display for TokenUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Prompt tokens: {}", self.prompt_tokens)?;
        if let Some(cached) = self.cached_tokens.filter(|c| *c > 0) {
            write!(f, " (CachedTokens: {})", cached)?;
        }
        write!(f, ", Completion tokens: {}", self.completion_tokens)?;
        if let Some(reasoning) = self.reasoning_tokens.filter(|r| *r > 0) {
            write!(f, " (ReasoningTokens: {})", reasoning)?;
        }
        write!(f, ", Total tokens: {}", self.total_tokens)
    }
}
