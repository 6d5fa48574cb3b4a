//! Entry point for the lesson viewer.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments.
//! - Load user configuration from `conf/config.toml`.
//! - Open the lesson, apply the requested actions and print the result.
//! - Optionally play the lesson audio clamped to its window.
//! - Translate free text without opening a lesson.

mod player;

use anyhow::{Context, Result, anyhow, bail};
use lesson_core::assist::{AssistOutcome, TranslationAssistant};
use lesson_core::config::load_config;
use lesson_core::session::{LessonSnapshot, PronunciationPanel, TranslationPanel};
use lesson_core::{
    AuthContext, AuthUser, FileProgressStore, LessonCommand, LessonSession, ProgressStore,
    Vocabulary, load_lesson,
};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const USAGE: &str = "Usage: lesson-viewer <lesson.json> [--login id:username] [--logout] \
[--known word]... [--unknown word]... [--select index] [--pronounce] [--complete] \
[--translate] [--json] [--play]\n       lesson-viewer --translate-text <text>";

const ASSIST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default)]
struct CliArgs {
    lesson_path: Option<PathBuf>,
    translate_text: Option<String>,
    login: Option<AuthUser>,
    logout: bool,
    known: Vec<String>,
    unknown: Vec<String>,
    select: Option<usize>,
    pronounce: bool,
    complete: bool,
    translate: bool,
    json: bool,
    play: bool,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args(env::args().skip(1))?;
    let config = load_config(Path::new("conf/config.toml"));
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        level = %config.log_level,
        data_dir = %config.data_dir,
        "Starting lesson viewer"
    );

    if let Some(text) = &args.translate_text {
        let assistant = TranslationAssistant::new(&config);
        println!("{}", translate_free_text(&assistant, text));
    }
    let Some(lesson_path) = args.lesson_path.clone() else {
        return Ok(());
    };
    info!(path = %lesson_path.display(), "Opening lesson");

    let store: Arc<dyn ProgressStore> = Arc::new(FileProgressStore::new(&config.data_dir));
    let auth = AuthContext::with_store(Arc::clone(&store));
    if args.logout {
        auth.logout();
    }
    if let Some(user) = args.login.clone() {
        auth.login(user);
    }

    let lesson = load_lesson(&lesson_path)?;
    let audio_src = lesson.audio_src.clone();
    let mut session = LessonSession::new(
        lesson,
        auth,
        store,
        TranslationAssistant::new(&config),
    );

    for word in &args.known {
        session.apply_command(LessonCommand::MarkKnown { word: word.clone() });
    }
    for word in &args.unknown {
        session.apply_command(LessonCommand::MarkUnknown { word: word.clone() });
    }
    if args.complete {
        session.apply_command(LessonCommand::ToggleComplete);
    }
    if let Some(segment_idx) = args.select {
        session.apply_command(LessonCommand::WordClicked { segment_idx });
        if args.pronounce {
            session.apply_command(LessonCommand::PronounceSelected);
        }
    }
    if args.translate {
        session.apply_command(LessonCommand::RequestTranslation);
    }
    while session.is_assist_pending() {
        if !session.wait_for_assist(ASSIST_TIMEOUT) {
            warn!("Timed out waiting for the translation assistant");
            break;
        }
    }

    let snapshot = session.apply_command(LessonCommand::GetSnapshot).snapshot;
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&snapshot).context("Serializing lesson snapshot")?
        );
    } else {
        print_snapshot(&snapshot);
    }

    if args.play {
        let src = audio_src.ok_or_else(|| anyhow!("Lesson has no audio source"))?;
        let path = resolve_audio_path(&lesson_path, &src)?;
        let stop = install_stop_flag();
        player::play_lesson_audio(&mut session, &path, &config, &stop)?;
    }
    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs> {
    let mut cli = CliArgs::default();
    let mut lesson_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--login" => {
                let value = args.next().ok_or_else(|| anyhow!(USAGE))?;
                cli.login = Some(parse_user(&value)?);
            }
            "--logout" => cli.logout = true,
            "--known" => cli.known.push(args.next().ok_or_else(|| anyhow!(USAGE))?),
            "--unknown" => cli.unknown.push(args.next().ok_or_else(|| anyhow!(USAGE))?),
            "--select" => {
                let value = args.next().ok_or_else(|| anyhow!(USAGE))?;
                cli.select = Some(
                    value
                        .parse()
                        .with_context(|| format!("Invalid segment index: {value}"))?,
                );
            }
            "--pronounce" => cli.pronounce = true,
            "--complete" => cli.complete = true,
            "--translate" => cli.translate = true,
            "--translate-text" => {
                cli.translate_text = Some(args.next().ok_or_else(|| anyhow!(USAGE))?);
            }
            "--json" => cli.json = true,
            "--play" => cli.play = true,
            flag if flag.starts_with("--") => bail!("Unknown flag {flag}\n{USAGE}"),
            path => {
                if lesson_path.replace(PathBuf::from(path)).is_some() {
                    bail!("Only one lesson can be opened at a time\n{USAGE}");
                }
            }
        }
    }

    match lesson_path {
        Some(path) => {
            if !path.exists() {
                return Err(anyhow!("File not found: {}", path.display()));
            }
            cli.lesson_path = Some(path);
        }
        None if cli.translate_text.is_some() => {}
        None => bail!(USAGE),
    }
    Ok(cli)
}

/// Translate text outside any lesson. There are no vocabulary hints, and a
/// failure prints the configured fallback message.
fn translate_free_text(assistant: &TranslationAssistant, text: &str) -> String {
    match assistant.translate_text(text, &Vocabulary::new()) {
        AssistOutcome::Ready(translation) => translation,
        AssistOutcome::Fallback(message) => message,
    }
}

fn parse_user(value: &str) -> Result<AuthUser> {
    let (id, username) = value
        .split_once(':')
        .ok_or_else(|| anyhow!("Expected id:username, got {value}"))?;
    if id.trim().is_empty() || username.trim().is_empty() {
        bail!("Expected id:username, got {value}");
    }
    Ok(AuthUser {
        id: id.trim().to_string(),
        username: username.trim().to_string(),
    })
}

/// Local audio paths are resolved next to the lesson file.
fn resolve_audio_path(lesson_path: &Path, src: &str) -> Result<PathBuf> {
    if src.contains("://") {
        bail!("Only local audio files can be played: {src}");
    }
    let path = Path::new(src);
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        lesson_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(path)
    };
    if !resolved.exists() {
        bail!("Audio file not found: {}", resolved.display());
    }
    Ok(resolved)
}

fn install_stop_flag() -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    if let Err(err) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C; stopping playback");
        flag.store(true, Ordering::SeqCst);
    }) {
        warn!("Failed to install Ctrl+C signal handler: {err}");
    }
    stop
}

fn print_snapshot(snapshot: &LessonSnapshot) {
    println!("{}", snapshot.title);
    println!();

    let mut line = String::new();
    for (idx, segment) in snapshot.segments.iter().enumerate() {
        match &segment.translation {
            Some(translation) => line.push_str(&format!("{}⟨{idx}:{translation}⟩", segment.text)),
            None => line.push_str(&segment.text),
        }
    }
    println!("{line}");
    println!();

    match (&snapshot.user, &snapshot.progress) {
        (Some(user), Some(progress)) => {
            println!(
                "{}: {}/{} words known ({:.0}%)",
                user.username,
                progress.known,
                progress.total,
                progress.percent()
            );
            if snapshot.completed == Some(true) {
                println!("Lesson completed");
            }
        }
        _ => println!("Sign in to track your progress"),
    }

    if let Some(popup) = &snapshot.selected_word {
        let status = match popup.is_known {
            Some(true) => " (known)",
            Some(false) => " (not known yet)",
            None => "",
        };
        println!("{} = {}{status}", popup.word, popup.translation);
    }

    match &snapshot.pronunciation {
        PronunciationPanel::Ready {
            word,
            translation,
            phonetic,
            audio_data_uri,
        } => println!(
            "{word} [{phonetic}] {translation} ({} bytes of audio)",
            audio_data_uri.len()
        ),
        PronunciationPanel::Failed { word, message } => println!("{word}: {message}"),
        PronunciationPanel::Idle | PronunciationPanel::Loading { .. } => {}
    }

    match &snapshot.translation {
        TranslationPanel::Ready { text } => {
            println!();
            println!("{text}");
        }
        TranslationPanel::Failed { message } => {
            println!();
            println!("{message}");
        }
        TranslationPanel::Idle | TranslationPanel::Loading => {}
    }
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    warn!("Logging initialized; override level with config.log_level or RUST_LOG");
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("debug"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::config::AppConfig;

    #[test]
    fn parses_user_pairs() {
        let user = parse_user("42: ana ").unwrap();
        assert_eq!(user.id, "42");
        assert_eq!(user.username, "ana");
        assert!(parse_user("ana").is_err());
        assert!(parse_user(":ana").is_err());
    }

    fn args(items: &[&str]) -> impl Iterator<Item = String> {
        items
            .iter()
            .map(|item| item.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn free_text_translation_needs_no_lesson() {
        let cli = parse_args(args(&["--translate-text", "Привет, мир"])).unwrap();
        assert_eq!(cli.translate_text.as_deref(), Some("Привет, мир"));
        assert!(cli.lesson_path.is_none());

        assert!(parse_args(args(&[])).is_err());
        assert!(parse_args(args(&["--translate-text"])).is_err());
    }

    #[test]
    fn free_text_translation_without_provider_prints_fallback() {
        let config = AppConfig::default();
        let assistant = TranslationAssistant::new(&config);
        assert_eq!(translate_free_text(&assistant, "Привет"), config.text_fallback);
        assert_eq!(translate_free_text(&assistant, "   "), "");
    }

    #[test]
    fn rejects_remote_audio() {
        assert!(resolve_audio_path(Path::new("lesson.json"), "https://cdn/a.mp3").is_err());
    }

    #[test]
    fn default_config_loops_a_few_times() {
        assert_eq!(AppConfig::default().audio_max_window_loops, 3);
    }
}
