//! Config file locations and edits (`init`, `config set`, `config list`).

use std::io::Write;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::ConfigError;

use super::loader::split_list;
use super::{AppConfig, CONFIG_NAME, CONFIG_TYPE, KEYS, KeyKind, key_kind};

/// Directory under the user config dir used when the platform dir is unknown.
const FALLBACK_CONFIG_DIR: &str = ".config/reviewbot";

/// `<user config dir>/reviewbot`, falling back to `~/.config/reviewbot`.
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    if let Some(dir) = dirs::config_dir() {
        return Ok(dir.join(CONFIG_NAME));
    }
    dirs::home_dir()
        .map(|home| home.join(FALLBACK_CONFIG_DIR))
        .ok_or(ConfigError::NoConfigDir)
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(default_config_dir()?.join(config_file_name()))
}

fn config_file_name() -> String {
    format!("{}.{}", CONFIG_NAME, CONFIG_TYPE)
}

/// `./config/`, the working directory, then the user config dir.
pub(crate) fn default_search_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from("./config/"), PathBuf::from(".")];
    if let Ok(dir) = default_config_dir() {
        dirs.push(dir);
    }
    dirs
}

/// Make a `--config` path absolute against the working directory.
pub fn resolve_config_path(path: &Path) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(cwd.join(path))
}

/// Write the defaults to `path` unless a file is already there.
///
/// Returns whether a file was created.
pub fn ensure_default_config_file(path: &Path) -> Result<bool, ConfigError> {
    if path.exists() {
        return Ok(false);
    }
    write_config(path, &AppConfig::default())?;
    debug!("Created default config file {}", path.display());
    Ok(true)
}

/// Serialize `cfg` to YAML and write it atomically with owner-only permissions.
pub fn write_config(path: &Path, cfg: &AppConfig) -> Result<(), ConfigError> {
    let value = serde_yaml::to_value(cfg).map_err(ConfigError::Yaml)?;
    write_yaml(path, &value)
}

fn write_yaml(path: &Path, value: &Value) -> Result<(), ConfigError> {
    let content = serde_yaml::to_string(value).map_err(ConfigError::Yaml)?;
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(content.as_bytes()).map_err(write_err)?;
    restrict_permissions(tmp.path()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn read_yaml(path: &Path) -> Result<Value, ConfigError> {
    if !path.exists() {
        return Ok(Value::Mapping(Mapping::new()));
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(Value::Mapping(Mapping::new()));
    }
    serde_yaml::from_str(&content).map_err(ConfigError::Yaml)
}

/// Convert a command-line string into the YAML value for `key`.
pub fn parse_value(key: &str, raw: &str) -> Result<Value, ConfigError> {
    let kind = key_kind(key).ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
    let invalid = || ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
        expected: kind.describe(),
    };
    let trimmed = raw.trim();

    Ok(match kind {
        KeyKind::Str => Value::String(trimmed.to_string()),
        KeyKind::Int => Value::Number(trimmed.parse::<i64>().map_err(|_| invalid())?.into()),
        KeyKind::Float => {
            let v = trimmed.parse::<f64>().map_err(|_| invalid())?;
            if !v.is_finite() {
                return Err(invalid());
            }
            Value::Number(v.into())
        }
        KeyKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Value::Bool(true),
            "false" | "0" | "no" | "off" => Value::Bool(false),
            _ => return Err(invalid()),
        },
        KeyKind::List => Value::Sequence(split_list(raw).into_iter().map(Value::String).collect()),
    })
}

/// Set one dotted key in the config file at `path`, creating it if needed.
///
/// Keys not present in the file are added; other keys keep their values.
pub fn set_value(path: &Path, key: &str, raw: &str) -> Result<(), ConfigError> {
    let value = parse_value(key, raw)?;
    let mut root = read_yaml(path)?;
    insert_dotted(&mut root, key, value);

    // Reject files that would no longer load.
    serde_yaml::from_value::<AppConfig>(root.clone()).map_err(ConfigError::Yaml)?;

    write_yaml(path, &root)
}

fn insert_dotted(node: &mut Value, key: &str, value: Value) {
    if !node.is_mapping() {
        *node = Value::Mapping(Mapping::new());
    }
    let Value::Mapping(map) = node else {
        return;
    };
    match key.split_once('.') {
        None => {
            map.insert(Value::from(key), value);
        }
        Some((head, rest)) => {
            let child = map.entry(Value::from(head)).or_insert(Value::Null);
            insert_dotted(child, rest, value);
        }
    }
}

/// Flatten `cfg` into `(key, display value)` pairs with secrets masked.
pub fn list_entries(cfg: &AppConfig) -> Result<Vec<(&'static str, String)>, ConfigError> {
    let root = serde_yaml::to_value(cfg).map_err(ConfigError::Yaml)?;
    Ok(KEYS
        .iter()
        .map(|(key, _)| {
            let shown = lookup_dotted(&root, key)
                .map(display_value)
                .unwrap_or_default();
            let shown = if *key == "ai.api_key" {
                mask_secret(&shown)
            } else {
                shown
            };
            (*key, shown)
        })
        .collect())
}

fn lookup_dotted<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(root, |node, part| node.get(part))
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Sequence(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

/// Keep only the first and last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_default_config_file_writes_defaults_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("reviewbot.yaml");

        assert!(ensure_default_config_file(&path).unwrap());
        let written: AppConfig =
            serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, AppConfig::default());

        std::fs::write(&path, "ai:\n  model: custom\n").unwrap();
        assert!(!ensure_default_config_file(&path).unwrap());
        assert!(std::fs::read_to_string(&path).unwrap().contains("custom"));
    }

    #[cfg(unix)]
    #[test]
    fn test_written_config_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviewbot.yaml");
        write_config(&path, &AppConfig::default()).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_resolve_config_path_makes_relative_absolute() {
        let resolved = resolve_config_path(Path::new("conf/reviewbot.yaml")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("conf/reviewbot.yaml"));

        let absolute = std::env::temp_dir().join("x.yaml");
        assert_eq!(resolve_config_path(&absolute).unwrap(), absolute);
    }

    #[test]
    fn test_parse_value_by_kind() {
        assert_eq!(parse_value("git.diff_unified", "5").unwrap(), Value::from(5));
        assert_eq!(parse_value("git.amend", "yes").unwrap(), Value::Bool(true));
        assert_eq!(parse_value("ai.temperature", "0.2").unwrap(), Value::from(0.2));
        assert_eq!(
            parse_value("proxy.headers", "A=1, B=2").unwrap(),
            Value::Sequence(vec![Value::from("A=1"), Value::from("B=2")])
        );
        assert!(matches!(
            parse_value("git.diff_unified", "five"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_value("ai.unknown", "x"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_set_value_preserves_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviewbot.yaml");
        std::fs::write(&path, "ai:\n  provider: gemini\n").unwrap();

        set_value(&path, "ai.api_key", "sk-123").unwrap();
        set_value(&path, "runtime.review.stream", "true").unwrap();

        let cfg: AppConfig =
            serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(cfg.ai.provider, "gemini");
        assert_eq!(cfg.ai.api_key, "sk-123");
        assert!(cfg.runtime.review.stream);
    }

    #[test]
    fn test_set_value_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.yaml");
        set_value(&path, "git.lang", "ja").unwrap();
        let cfg: AppConfig =
            serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(cfg.git.lang, "ja");
    }

    #[test]
    fn test_list_entries_masks_api_key() {
        let mut cfg = AppConfig::default();
        cfg.ai.api_key = "sk-abcdefghijkl".into();
        cfg.git.exclude_list = vec!["a".into(), "b".into()];

        let entries = list_entries(&cfg).unwrap();
        let get = |k: &str| entries.iter().find(|(key, _)| *key == k).unwrap().1.clone();

        assert_eq!(get("ai.api_key"), "sk-a****ijkl");
        assert_eq!(get("git.exclude_list"), "a,b");
        assert_eq!(get("git.diff_unified"), "3");
        assert_eq!(entries.len(), KEYS.len());
    }

    #[test]
    fn test_mask_secret_short_values() {
        assert_eq!(mask_secret(""), "");
        assert_eq!(mask_secret("abc"), "***");
    }
}
