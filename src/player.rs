//! Command-line playback of a lesson's audio window using `rodio`.
//!
//! The player feeds media events into the session and performs whatever seek
//! the window controller asks for. Seeking rebuilds the sink from a decoder
//! that skips ahead, so it works for every format the decoder understands.

use anyhow::{Context, Result};
use lesson_core::audio::MediaEvent;
use lesson_core::config::AppConfig;
use lesson_core::LessonSession;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

struct WindowPlayer {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sink: Sink,
    path: PathBuf,
    volume: f32,
    /// Position the current sink started from.
    base: f64,
    started_at: Instant,
}

impl WindowPlayer {
    fn open(path: &Path, volume: f32) -> Result<Self> {
        let (stream, handle) = OutputStream::try_default().context("Opening audio output")?;
        let sink = Sink::try_new(&handle).context("Creating sink")?;
        let mut player = Self {
            _stream: stream,
            handle,
            sink,
            path: path.to_path_buf(),
            volume,
            base: 0.0,
            started_at: Instant::now(),
        };
        player.start_at(0.0)?;
        Ok(player)
    }

    fn start_at(&mut self, position: f64) -> Result<()> {
        let reader = BufReader::new(
            File::open(&self.path)
                .with_context(|| format!("Opening audio file {}", self.path.display()))?,
        );
        let source = Decoder::new(reader)
            .with_context(|| format!("Decoding audio file {}", self.path.display()))?
            .skip_duration(Duration::from_secs_f64(position.max(0.0)));

        let sink = Sink::try_new(&self.handle).context("Creating sink")?;
        sink.set_volume(self.volume);
        sink.append(source);
        sink.play();
        self.sink.stop();
        self.sink = sink;
        self.base = position;
        self.started_at = Instant::now();
        debug!(position, "Audio started");
        Ok(())
    }

    fn position(&self) -> f64 {
        self.base + self.started_at.elapsed().as_secs_f64()
    }

    fn is_finished(&self) -> bool {
        self.sink.empty()
    }

    fn stop(self) {
        self.sink.stop();
    }
}

/// Play the audio at `path`, looping inside the lesson's window until the
/// configured loop count is reached, the file ends or `stop` is raised.
pub fn play_lesson_audio(
    session: &mut LessonSession,
    path: &Path,
    config: &AppConfig,
    stop: &AtomicBool,
) -> Result<()> {
    let window = session.audio().window();
    info!(
        path = %path.display(),
        ?window,
        max_loops = config.audio_max_window_loops,
        "Starting lesson audio"
    );

    let mut player = WindowPlayer::open(path, config.audio_volume)?;
    feed(session, &mut player, MediaEvent::LoadedMetadata)?;
    let position = player.position();
    feed(session, &mut player, MediaEvent::Play { position })?;

    let tick = Duration::from_millis(config.audio_tick_interval_ms.max(10));
    loop {
        if stop.load(Ordering::SeqCst) {
            info!("Playback interrupted");
            break;
        }
        thread::sleep(tick);

        let position = player.position();
        feed(session, &mut player, MediaEvent::TimeUpdate { position })?;

        let loops = session.audio().loops();
        if config.audio_max_window_loops > 0 && loops >= u64::from(config.audio_max_window_loops) {
            info!(loops, "Reached configured loop count");
            break;
        }
        if player.is_finished() {
            info!("Audio file ended");
            break;
        }
    }
    player.stop();
    Ok(())
}

fn feed(session: &mut LessonSession, player: &mut WindowPlayer, event: MediaEvent) -> Result<()> {
    if let Some(position) = session.media_event(event) {
        player.start_at(position)?;
    }
    Ok(())
}
