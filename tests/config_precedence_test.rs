//! Integration tests for layered configuration loading.
//!
//! These tests modify process environment variables and must run serially.

use std::path::Path;

use reviewbot::config::file::{parse_value, set_value, write_config};
use reviewbot::config::{AppConfig, GitOverrides, LoadOptions, Overrides, ReviewMode, load, resolve};
use reviewbot::error::ConfigError;
use serial_test::serial;

const DIFF_UNIFIED_VAR: &str = "REVIEWBOT_GIT_DIFF_UNIFIED";
const API_KEY_VAR: &str = "REVIEWBOT_AI_API_KEY";

fn options(dir: &Path, overrides: Overrides) -> LoadOptions {
    LoadOptions {
        explicit_path: None,
        search_dirs: vec![dir.to_path_buf()],
        overrides,
        ..LoadOptions::default()
    }
}

fn write_file(dir: &Path, yaml: &str) {
    std::fs::write(dir.join("reviewbot.yaml"), yaml).unwrap();
}

fn cli_diff_unified(value: i64) -> Overrides {
    Overrides {
        git: GitOverrides {
            diff_unified: Some(value),
            ..GitOverrides::default()
        },
        ..Overrides::default()
    }
}

#[test]
#[serial]
fn test_defaults_file_then_cli() {
    let dir = tempfile::tempdir().unwrap();
    temp_env::with_vars_unset([DIFF_UNIFIED_VAR, API_KEY_VAR], || {
        let cfg = resolve(&options(dir.path(), Overrides::default())).unwrap();
        assert_eq!(cfg.git.diff_unified, 3);

        write_file(dir.path(), "git:\n  diff_unified: 5\n");
        let cfg = resolve(&options(dir.path(), Overrides::default())).unwrap();
        assert_eq!(cfg.git.diff_unified, 5);

        let cfg = resolve(&options(dir.path(), cli_diff_unified(7))).unwrap();
        assert_eq!(cfg.git.diff_unified, 7);
    });
}

#[test]
#[serial]
fn test_env_beats_file_and_cli_beats_env() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "git:\n  diff_unified: 5\nai:\n  api_key: from-file\n");

    temp_env::with_vars(
        [(DIFF_UNIFIED_VAR, Some("6")), (API_KEY_VAR, Some("from-env"))],
        || {
            let cfg = resolve(&options(dir.path(), Overrides::default())).unwrap();
            assert_eq!(cfg.git.diff_unified, 6);
            assert_eq!(cfg.ai.api_key, "from-env");

            let cfg = resolve(&options(dir.path(), cli_diff_unified(7))).unwrap();
            assert_eq!(cfg.git.diff_unified, 7);
        },
    );
}

#[test]
#[serial]
fn test_empty_env_var_keeps_file_value() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "ai:\n  api_key: sk-file\n");

    temp_env::with_vars(
        [(API_KEY_VAR, Some("")), (DIFF_UNIFIED_VAR, Some(""))],
        || {
            let cfg = load(&options(dir.path(), Overrides::default())).unwrap();
            assert_eq!(cfg.ai.api_key, "sk-file");
            assert_eq!(cfg.git.diff_unified, 3);
        },
    );
}

#[test]
#[serial]
fn test_env_list_values_are_comma_separated() {
    let dir = tempfile::tempdir().unwrap();
    temp_env::with_vars(
        [
            ("REVIEWBOT_GIT_EXCLUDE_LIST", Some("vendor/, *.snap")),
            ("REVIEWBOT_PROXY_HEADERS", Some("X-A=1,X-B=2")),
            ("REVIEWBOT_RUNTIME_REVIEW_STREAM", Some("true")),
        ],
        || {
            let cfg = resolve(&options(dir.path(), Overrides::default())).unwrap();
            assert_eq!(cfg.git.exclude_list, vec!["vendor/", "*.snap"]);
            assert_eq!(cfg.proxy.headers, vec!["X-A=1", "X-B=2"]);
            assert!(cfg.runtime.review.stream);
        },
    );
}

#[test]
#[serial]
fn test_load_validates_and_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "ai:\n  api_key: sk-test\n  temperature: 1.5\n");

    temp_env::with_vars_unset([API_KEY_VAR], || {
        let err = load(&options(dir.path(), Overrides::default())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { section: "ai", .. }));
        assert!(err.to_string().contains("temperature must be between 0 and 1"));

        // Resolution alone does not validate.
        assert!(resolve(&options(dir.path(), Overrides::default())).is_ok());
    });
}

#[test]
#[serial]
fn test_missing_api_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    temp_env::with_vars_unset([API_KEY_VAR], || {
        let err = load(&options(dir.path(), Overrides::default())).unwrap_err();
        assert!(err.to_string().contains("api_key cannot be empty"));
    });
}

#[test]
#[serial]
fn test_cli_provider_and_model_override() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "ai:\n  provider: openai\n  api_key: k\n  model: gpt-4o\n");

    temp_env::with_vars_unset([API_KEY_VAR, "REVIEWBOT_AI_PROVIDER", "REVIEWBOT_AI_MODEL"], || {
        let overrides = Overrides {
            ai_provider: Some("gemini".into()),
            ai_model: Some("gemini-2.0-flash".into()),
            ..Overrides::default()
        };
        let cfg = load(&options(dir.path(), overrides)).unwrap();
        assert_eq!(cfg.ai.provider, "gemini");
        assert_eq!(cfg.ai.model, "gemini-2.0-flash");
    });
}

#[test]
#[serial]
fn test_runtime_review_settings_fall_back_to_git() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "git:\n  diff_file: changes.diff\n  lang: ja\nruntime:\n  review:\n    mode: external\n",
    );

    temp_env::with_vars_unset([API_KEY_VAR], || {
        let settings = resolve(&options(dir.path(), Overrides::default()))
            .unwrap()
            .review_settings();
        assert_eq!(settings.mode, ReviewMode::External);
        assert_eq!(settings.diff_file.as_deref(), Some(Path::new("changes.diff")));
        assert_eq!(settings.output_lang, "ja");
    });
}

#[test]
#[serial]
fn test_set_value_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reviewbot.yaml");
    let mut cfg = AppConfig::default();
    cfg.ai.api_key = "sk-test".into();
    write_config(&path, &cfg).unwrap();

    set_value(&path, "git.diff_unified", "9").unwrap();
    set_value(&path, "ai.temperature", "0.2").unwrap();
    set_value(&path, "git.exclude_list", "a/,b/").unwrap();

    temp_env::with_vars_unset([DIFF_UNIFIED_VAR, API_KEY_VAR], || {
        let cfg = load(&options(dir.path(), Overrides::default())).unwrap();
        assert_eq!(cfg.git.diff_unified, 9);
        assert!((cfg.ai.temperature - 0.2).abs() < f64::EPSILON);
        assert_eq!(cfg.git.exclude_list, vec!["a/", "b/"]);
        assert_eq!(cfg.ai.api_key, "sk-test");
    });
}

#[test]
fn test_set_value_rejects_unknown_keys_and_bad_types() {
    assert!(matches!(parse_value("ai.nope", "x"), Err(ConfigError::UnknownKey(_))));
    assert!(matches!(
        parse_value("git.diff_unified", "many"),
        Err(ConfigError::InvalidValue { .. })
    ));
}
