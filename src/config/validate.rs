//! Per-section validation of a resolved configuration.

use url::Url;

use crate::error::{ConfigError, ValidationError};
use crate::prompt::is_supported_language;

use super::{AiConfig, AppConfig, GitConfig, ProxyConfig, RuntimeConfig};

impl AppConfig {
    /// Check every section and return the first failure, prefixed with its section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.git
            .validate()
            .map_err(|e| ConfigError::invalid("git", e))?;
        self.ai.validate().map_err(|e| ConfigError::invalid("ai", e))?;
        self.proxy
            .validate()
            .map_err(|e| ConfigError::invalid("proxy", e))?;
        self.runtime
            .validate()
            .map_err(|e| ConfigError::invalid("runtime: review", e))?;
        Ok(())
    }
}

impl GitConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.diff_unified < 0 {
            return Err(ValidationError::NegativeDiffUnified);
        }
        if self.max_input_size <= 0 {
            return Err(ValidationError::NonPositiveMaxInputSize);
        }
        let lang = self.lang.trim();
        if !lang.is_empty() && !is_supported_language(lang) {
            return Err(ValidationError::InvalidLanguage(lang.to_string()));
        }
        Ok(())
    }
}

impl AiConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.provider.trim().is_empty() {
            return Err(ValidationError::EmptyProvider);
        }
        if self.api_key.trim().is_empty() {
            return Err(ValidationError::EmptyApiKey);
        }
        if self.max_tokens <= 0 {
            return Err(ValidationError::NonPositiveMaxTokens);
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ValidationError::TemperatureOutOfRange(self.temperature));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ValidationError::TopPOutOfRange(self.top_p));
        }
        Ok(())
    }
}

impl ProxyConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let proxy_url = self.proxy_url.trim();
        if !proxy_url.is_empty() && !is_absolute_uri(proxy_url) {
            return Err(ValidationError::InvalidProxyUrl(proxy_url.to_string()));
        }
        let socks_url = self.socks_url.trim();
        if !socks_url.is_empty() && !is_absolute_uri(socks_url) {
            return Err(ValidationError::InvalidSocksUrl(socks_url.to_string()));
        }
        if self.timeout < 0 {
            return Err(ValidationError::NegativeTimeout);
        }
        Ok(())
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mode = self.review.mode.trim();
        if !mode.is_empty() && mode != "local" && mode != "external" {
            return Err(ValidationError::InvalidMode(mode.to_string()));
        }
        if self.review.max_input_size < 0 {
            return Err(ValidationError::NegativeMaxInputSize);
        }
        Ok(())
    }
}

/// A URI with a scheme and a host.
fn is_absolute_uri(value: &str) -> bool {
    Url::parse(value).is_ok_and(|url| url.has_host())
}
