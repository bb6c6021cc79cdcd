//! Layered configuration loading
//!
//! Sources, later ones winning:
//! 1. Built-in defaults for the detected environment
//! 2. `config/<environment>.toml` (optional)
//! 3. `OTP_APP__*` environment variables, `__` separating nested keys,
//!    e.g. `OTP_APP__OTP__MAX_VERIFY_ATTEMPTS=3`

use config::{Config, File, Source};
use otp_shared::config::{AppConfig, Environment};
use tracing::info;

use crate::InfrastructureError;

/// Prefix of environment variables that override configuration keys
pub const ENV_PREFIX: &str = "OTP_APP";

/// Load configuration for the current environment
///
/// Reads `.env` first when present, so its variables take part in both
/// environment detection and the overrides.
pub fn load_config() -> Result<AppConfig, InfrastructureError> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env();
    load_config_with(environment, env_overrides())
}

/// Load configuration for an explicit environment and override source
pub fn load_config_with<S>(environment: Environment, overrides: S) -> Result<AppConfig, InfrastructureError>
where
    S: Source + Send + Sync + 'static,
{
    info!(environment = %environment, "Loading configuration");

    let app = build_settings(environment, overrides)
        .and_then(|settings| settings.try_deserialize::<AppConfig>())
        .map_err(|e| InfrastructureError::Config(e.to_string()))?;

    app.validate()
        .map_err(|e| InfrastructureError::Config(e.to_string()))?;

    Ok(app)
}

/// Environment variable source with the service prefix
pub fn env_overrides() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

/// Seed environment-dependent defaults, then layer file and overrides
///
/// Keys not seeded here fall back to the serde defaults of `AppConfig`.
fn build_settings<S>(environment: Environment, overrides: S) -> Result<Config, config::ConfigError>
where
    S: Source + Send + Sync + 'static,
{
    let defaults = AppConfig::for_environment(environment);

    Config::builder()
        .set_default("environment", environment.as_str())?
        .set_default("logging.level", defaults.logging.level)?
        .set_default("logging.format", defaults.logging.format.as_str())?
        .set_default("logging.colored", defaults.logging.colored)?
        .set_default("logging.source_location", defaults.logging.source_location)?
        .add_source(File::with_name(&environment.config_file()).required(false))
        .add_source(overrides)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use otp_shared::config::LogFormat;

    fn overrides(toml: &str) -> impl Source + Send + Sync + 'static {
        File::from_str(toml, FileFormat::Toml)
    }

    #[test]
    fn test_defaults_follow_environment() {
        let config = load_config_with(Environment::Production, overrides("")).unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.otp.default_ttl_minutes, 5);
        assert_eq!(config.otp.default_code_length, 6);
        assert_eq!(config.otp.min_rate_limit_seconds, 60);
        assert_eq!(config.otp.max_verify_attempts, 5);
        assert_eq!(config.otp.attempts_ttl_minutes, None);
    }

    #[test]
    fn test_overrides_merge_with_defaults() {
        let config = load_config_with(
            Environment::Development,
            overrides(
                r#"
                [otp]
                max_verify_attempts = 3
                default_code_length = 8

                [cache]
                key_prefix = "campus"

                [logging]
                format = "compact"
                "#,
            ),
        )
        .unwrap();

        assert_eq!(config.otp.max_verify_attempts, 3);
        assert_eq!(config.otp.default_code_length, 8);
        assert_eq!(config.otp.default_ttl_minutes, 5);
        assert_eq!(config.cache.key_prefix.as_deref(), Some("campus"));
        assert_eq!(config.cache.url, "redis://localhost:6379");
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let result = load_config_with(
            Environment::Development,
            overrides("[otp]\ndefault_code_length = 19\n"),
        );

        assert!(matches!(result, Err(InfrastructureError::Config(_))));
    }

    #[test]
    fn test_single_verify_attempt_is_rejected() {
        let result = load_config_with(
            Environment::Development,
            overrides("[otp]\nmax_verify_attempts = 1\n"),
        );

        assert!(matches!(result, Err(InfrastructureError::Config(_))));
    }
}
