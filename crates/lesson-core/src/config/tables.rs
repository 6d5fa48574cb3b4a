use super::defaults;
use super::models::{AppConfig, LogLevel};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    audio: AudioConfig,
    #[serde(default)]
    assist: AssistConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            log_level: tables.logging.log_level,
            data_dir: tables.storage.data_dir,
            audio_volume: tables.audio.volume,
            audio_tick_interval_ms: tables.audio.tick_interval_ms,
            audio_max_window_loops: tables.audio.max_window_loops,
            text_fallback: tables.assist.text_fallback,
            word_fallback: tables.assist.word_fallback,
            pronunciation_sample_rate: tables.assist.pronunciation_sample_rate,
            pronunciation_channels: tables.assist.pronunciation_channels,
            pronunciation_sample_width: tables.assist.pronunciation_sample_width,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            logging: LoggingConfig {
                log_level: config.log_level,
            },
            storage: StorageConfig {
                data_dir: config.data_dir.clone(),
            },
            audio: AudioConfig {
                volume: config.audio_volume,
                tick_interval_ms: config.audio_tick_interval_ms,
                max_window_loops: config.audio_max_window_loops,
            },
            assist: AssistConfig {
                text_fallback: config.text_fallback.clone(),
                word_fallback: config.word_fallback.clone(),
                pronunciation_sample_rate: config.pronunciation_sample_rate,
                pronunciation_channels: config.pronunciation_channels,
                pronunciation_sample_width: config.pronunciation_sample_width,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct StorageConfig {
    #[serde(default = "defaults::default_data_dir")]
    data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_dir: defaults::default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct AudioConfig {
    #[serde(default = "defaults::default_audio_volume")]
    volume: f32,
    #[serde(default = "defaults::default_audio_tick_interval_ms")]
    tick_interval_ms: u64,
    #[serde(default = "defaults::default_audio_max_window_loops")]
    max_window_loops: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        AudioConfig {
            volume: defaults::default_audio_volume(),
            tick_interval_ms: defaults::default_audio_tick_interval_ms(),
            max_window_loops: defaults::default_audio_max_window_loops(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct AssistConfig {
    #[serde(default = "defaults::default_text_fallback")]
    text_fallback: String,
    #[serde(default = "defaults::default_word_fallback")]
    word_fallback: String,
    #[serde(default = "defaults::default_pronunciation_sample_rate")]
    pronunciation_sample_rate: u32,
    #[serde(default = "defaults::default_pronunciation_channels")]
    pronunciation_channels: u16,
    #[serde(default = "defaults::default_pronunciation_sample_width")]
    pronunciation_sample_width: u16,
}

impl Default for AssistConfig {
    fn default() -> Self {
        AssistConfig {
            text_fallback: defaults::default_text_fallback(),
            word_fallback: defaults::default_word_fallback(),
            pronunciation_sample_rate: defaults::default_pronunciation_sample_rate(),
            pronunciation_channels: defaults::default_pronunciation_channels(),
            pronunciation_sample_width: defaults::default_pronunciation_sample_width(),
        }
    }
}
