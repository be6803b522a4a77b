use codescribe_core::{CodeScribeConfig, ConfigError, ConfigManager, FileFailurePolicy};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_config_file_round_trips() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("nested").join("config.toml");

    ConfigManager::create_default_config(&config_path).unwrap();
    assert!(config_path.exists());

    let loaded = ConfigManager::read_toml_file(&config_path).unwrap();
    let defaults = CodeScribeConfig::default();
    assert_eq!(loaded.llm.provider, defaults.llm.provider);
    assert_eq!(loaded.llm.timeout_secs, defaults.llm.timeout_secs);
    assert_eq!(
        loaded.pipeline.max_concurrent_analyses,
        defaults.pipeline.max_concurrent_analyses
    );
}

#[test]
fn test_explicit_config_path_is_loaded() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("codescribe.toml");
    fs::write(
        &config_path,
        r#"
[llm]
provider = "openai-compatible"
base_url = "http://localhost:1234/v1"
timeout_secs = 30

[pipeline]
max_concurrent_analyses = 4
on_file_error = "skip"
"#,
    )
    .unwrap();

    let manager = ConfigManager::load(Some(&config_path)).unwrap();
    let config = manager.config();

    assert_eq!(manager.config_path(), Some(config_path.as_path()));
    assert_eq!(config.llm.timeout_secs, 30);
    assert_eq!(config.pipeline.failure_policy(), FileFailurePolicy::Skip);
}

#[test]
fn test_missing_explicit_config_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("absent.toml");

    let result = ConfigManager::load(Some(&missing));
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

#[test]
fn test_malformed_config_is_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("broken.toml");
    fs::write(&config_path, "[llm\nprovider = ").unwrap();

    let result = ConfigManager::read_toml_file(&config_path);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn test_uppercase_logging_values_are_accepted() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("codescribe.toml");
    fs::write(
        &config_path,
        r#"
[llm]
provider = "Qwen"

[logging]
level = "INFO"
format = "Compact"
"#,
    )
    .unwrap();

    let manager = ConfigManager::load(Some(&config_path)).unwrap();
    let config = manager.config();

    assert_eq!(config.llm.provider, "qwen");
    assert_eq!(config.logging.format, "compact");
    // CODESCRIBE_LOG_LEVEL may override the file, but never with uppercase
    assert_eq!(config.logging.level, config.logging.level.to_lowercase());
}
