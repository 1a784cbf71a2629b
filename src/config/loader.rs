//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{AppConfig, Environment};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables on top of file/default values.
///
/// `lookup` abstracts the environment so overrides can be tested without
/// mutating process state.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = lookup("BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    if let Some(url) = lookup("DATABASE_URL") {
        config.database.url = url;
    }
    if let Some(env) = lookup("APP_ENV").as_deref().and_then(Environment::parse) {
        config.logging.environment = env;
    }
    if let Some(flag) = lookup("ENABLE_DEBUG_ENDPOINTS") {
        config.debug.endpoints_enabled = parse_flag(&flag);
    }
}

/// `1`, `true` and `yes` (any case) enable a flag; anything else disables it.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_flag() {
        for value in ["1", "true", "TRUE", "Yes", " yes "] {
            assert!(parse_flag(value), "{value} should enable");
        }
        for value in ["0", "false", "no", "", "on", "enabled"] {
            assert!(!parse_flag(value), "{value} should disable");
        }
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        apply_env_overrides(
            &mut config,
            lookup_from(&[
                ("ENABLE_DEBUG_ENDPOINTS", "Yes"),
                ("APP_ENV", "production"),
                ("DATABASE_URL", "sqlite::memory:"),
                ("BIND_ADDRESS", "127.0.0.1:8080"),
            ]),
        );

        assert!(config.debug.endpoints_enabled);
        assert_eq!(config.logging.environment, Environment::Production);
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.listener.bind_address, "127.0.0.1:8080");
    }

    #[test]
    fn test_unknown_environment_is_ignored() {
        let mut config = AppConfig::default();
        let before = config.logging.environment;
        apply_env_overrides(&mut config, lookup_from(&[("APP_ENV", "staging")]));
        assert_eq!(config.logging.environment, before);
    }

    #[test]
    fn test_debug_endpoints_disabled_by_default() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, lookup_from(&[]));
        assert!(!config.debug.endpoints_enabled);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Some(Path::new("does/not/exist.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
