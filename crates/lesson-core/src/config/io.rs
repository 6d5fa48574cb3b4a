use super::models::AppConfig;
use super::tables::ConfigTables;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err:#}");
            AppConfig::default()
        }
    }
}

pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let tables: ConfigTables = toml::from_str(contents).context("Parsing config TOML")?;
    Ok(tables.into())
}

pub fn serialize_config(config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(&ConfigTables::from(config)).context("Serializing config TOML")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn empty_document_uses_defaults() {
        assert_eq!(parse_config("").unwrap(), AppConfig::default());
    }

    #[test]
    fn tables_override_individual_fields() {
        let config = parse_config(
            r#"
            [logging]
            log_level = "warn"

            [audio]
            max_window_loops = 0

            [assist]
            pronunciation_sample_rate = 16000
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.audio_max_window_loops, 0);
        assert_eq!(config.audio_tick_interval_ms, 250);
        assert_eq!(config.pronunciation_sample_rate, 16_000);
        assert_eq!(config.pronunciation_channels, 1);
        assert_eq!(config.data_dir, ".cache");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(parse_config("[logging]\nlog_level = \"loud\"").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config(Path::new("/nonexistent/config.toml"));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn serialized_config_parses_back() {
        let mut config = AppConfig::default();
        config.data_dir = "/var/lib/lessons".to_string();
        config.audio_volume = 0.5;

        let text = serialize_config(&config).unwrap();

        assert!(text.contains("[storage]"));
        assert_eq!(parse_config(&text).unwrap(), config);
    }
}
