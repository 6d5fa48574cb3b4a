pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Debug
}

pub(crate) fn default_data_dir() -> String {
    crate::store::DEFAULT_DATA_DIR.to_string()
}

pub(crate) fn default_audio_volume() -> f32 {
    1.0
}

pub(crate) fn default_audio_tick_interval_ms() -> u64 {
    250
}

pub(crate) fn default_audio_max_window_loops() -> u32 {
    3
}

pub(crate) fn default_text_fallback() -> String {
    "ترجمه در حال حاضر در دسترس نیست.".to_string()
}

pub(crate) fn default_word_fallback() -> String {
    "خطا در دریافت ترجمه کلمه.".to_string()
}

pub(crate) fn default_pronunciation_sample_rate() -> u32 {
    24_000
}

pub(crate) fn default_pronunciation_channels() -> u16 {
    1
}

pub(crate) fn default_pronunciation_sample_width() -> u16 {
    2
}
