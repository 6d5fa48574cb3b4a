use serde::Deserialize;

/// High-level app configuration, flattened from the TOML tables.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub log_level: LogLevel,
    pub data_dir: String,
    pub audio_volume: f32,
    pub audio_tick_interval_ms: u64,
    /// 0 keeps looping until playback is interrupted.
    pub audio_max_window_loops: u32,
    pub text_fallback: String,
    pub word_fallback: String,
    pub pronunciation_sample_rate: u32,
    pub pronunciation_channels: u16,
    /// Bytes per PCM sample.
    pub pronunciation_sample_width: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_level: crate::config::defaults::default_log_level(),
            data_dir: crate::config::defaults::default_data_dir(),
            audio_volume: crate::config::defaults::default_audio_volume(),
            audio_tick_interval_ms: crate::config::defaults::default_audio_tick_interval_ms(),
            audio_max_window_loops: crate::config::defaults::default_audio_max_window_loops(),
            text_fallback: crate::config::defaults::default_text_fallback(),
            word_fallback: crate::config::defaults::default_word_fallback(),
            pronunciation_sample_rate: crate::config::defaults::default_pronunciation_sample_rate(),
            pronunciation_channels: crate::config::defaults::default_pronunciation_channels(),
            pronunciation_sample_width: crate::config::defaults::default_pronunciation_sample_width(),
        }
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Debug
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
