//! Layered configuration resolution.

use std::path::PathBuf;

use config::{Config, File, FileFormat};
use tracing::debug;

use crate::error::ConfigError;

use super::{AppConfig, CONFIG_NAME, CONFIG_TYPE, ENV_PREFIX, KEYS, KeyKind};

/// Where to look for configuration and what to layer on top of it.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Config file given on the command line. Must exist when set.
    pub explicit_path: Option<PathBuf>,
    /// Directories searched in order when no explicit path is given.
    pub search_dirs: Vec<PathBuf>,
    pub config_name: String,
    pub config_type: String,
    pub env_prefix: String,
    pub overrides: Overrides,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            explicit_path: None,
            search_dirs: super::file::default_search_dirs(),
            config_name: CONFIG_NAME.to_string(),
            config_type: CONFIG_TYPE.to_string(),
            env_prefix: ENV_PREFIX.to_string(),
            overrides: Overrides::default(),
        }
    }
}

/// Command-line values, applied after every other layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub ai_provider: Option<String>,
    pub ai_model: Option<String>,
    pub git: GitOverrides,
    pub review: ReviewOverrides,
    pub commit: CommitOverrides,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GitOverrides {
    pub diff_unified: Option<i64>,
    /// Appended to the configured exclusions rather than replacing them.
    pub exclude_list: Vec<String>,
    pub amend: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewOverrides {
    pub mode: Option<String>,
    pub stream: Option<bool>,
    pub diff_file: Option<String>,
    pub max_input_size: Option<i64>,
    pub output_lang: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitOverrides {
    pub preview: Option<bool>,
    pub output_lang: Option<String>,
    pub auto_stage: Option<bool>,
}

impl Overrides {
    pub fn apply(&self, cfg: &mut AppConfig) {
        set_if(&mut cfg.ai.provider, &self.ai_provider);
        set_if(&mut cfg.ai.model, &self.ai_model);

        set_if(&mut cfg.git.diff_unified, &self.git.diff_unified);
        cfg.git
            .exclude_list
            .extend(self.git.exclude_list.iter().cloned());
        set_if(&mut cfg.git.amend, &self.git.amend);

        let review = &mut cfg.runtime.review;
        set_if(&mut review.mode, &self.review.mode);
        set_if(&mut review.stream, &self.review.stream);
        set_if(&mut review.diff_file, &self.review.diff_file);
        set_if(&mut review.max_input_size, &self.review.max_input_size);
        set_if(&mut review.output_lang, &self.review.output_lang);

        let commit = &mut cfg.runtime.commit;
        set_if(&mut commit.preview, &self.commit.preview);
        set_if(&mut commit.output_lang, &self.commit.output_lang);
        set_if(&mut commit.auto_stage, &self.commit.auto_stage);
    }
}

fn set_if<T: Clone>(slot: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *slot = v.clone();
    }
}

/// Resolve and validate the configuration.
///
/// Any validation failure is returned as-is; there is no partially valid result.
pub fn load(options: &LoadOptions) -> Result<AppConfig, ConfigError> {
    let cfg = resolve(options)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Merge defaults, file, environment and overrides without validating.
pub fn resolve(options: &LoadOptions) -> Result<AppConfig, ConfigError> {
    let defaults = Config::try_from(&AppConfig::default()).map_err(ConfigError::Load)?;
    let mut builder = Config::builder().add_source(defaults);

    if let Some(path) = find_config_file(options)? {
        debug!("Loading config file {}", path.display());
        builder = builder.add_source(File::new(&path.to_string_lossy(), FileFormat::Yaml));
    }

    for (key, value) in env_values(&options.env_prefix) {
        builder = builder.set_override(key, value).map_err(ConfigError::Load)?;
    }

    let mut cfg: AppConfig = builder
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(ConfigError::Load)?;

    options.overrides.apply(&mut cfg);
    Ok(cfg)
}

/// The explicit path if given, else the first `<dir>/<name>.<type>` that exists.
pub(crate) fn find_config_file(options: &LoadOptions) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = &options.explicit_path {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.clone()));
        }
        return Ok(Some(path.clone()));
    }

    let file_name = format!("{}.{}", options.config_name, options.config_type);
    Ok(options
        .search_dirs
        .iter()
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file()))
}

/// Environment variable bound to `key`: `PREFIX_` + key uppercased, `.` and `-` as `_`.
pub fn env_var_name(prefix: &str, key: &str) -> String {
    let name: String = key
        .chars()
        .map(|c| match c {
            '.' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();
    if prefix.is_empty() {
        name
    } else {
        format!("{}_{}", prefix.to_ascii_uppercase(), name)
    }
}

/// Values of every bound environment variable that is set.
fn env_values(prefix: &str) -> Vec<(&'static str, config::Value)> {
    KEYS.iter()
        .filter_map(|(key, kind)| {
            let var = env_var_name(prefix, key);
            // Set but empty counts as unset.
            let raw = std::env::var(&var).ok().filter(|raw| !raw.is_empty())?;
            debug!("Using {} from environment", var);
            let value = match kind {
                KeyKind::List => config::Value::from(split_list(&raw)),
                _ => config::Value::from(raw),
            };
            Some((*key, value))
        })
        .collect()
}

/// Split a comma-separated list, dropping blank entries.
pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
