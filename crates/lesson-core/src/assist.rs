//! AI-assisted translation and pronunciation.
//!
//! The provider is an external capability modelled by [`TextTranslator`] and
//! [`WordPronouncer`]. This module only shapes requests and results: empty
//! text short-circuits, raw PCM speech is wrapped into WAV, and every failure
//! is replaced by a user-facing fallback string instead of being propagated.
//! [`AssistDispatcher`] runs requests off the UI thread; there is no timeout
//! and no cancellation, callers simply ignore replies they no longer expect.

use crate::config::AppConfig;
use crate::vocabulary::Vocabulary;
use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::any::Any;
use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

pub trait TextTranslator: Send + Sync {
    /// Translate `text`, using `hints` as a guide for individual words.
    fn translate(&self, text: &str, hints: &Vocabulary) -> Result<String>;
}

/// Provider answer for a single word: raw little-endian PCM speech.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPronunciation {
    pub translation: String,
    pub phonetic: String,
    pub pcm: Vec<u8>,
}

pub trait WordPronouncer: Send + Sync {
    fn pronounce(&self, word: &str) -> Result<RawPronunciation>;
}

/// Vocabulary hints as the pretty JSON object sent alongside a text
/// translation prompt.
pub fn hints_json(hints: &Vocabulary) -> Result<String> {
    hints.to_json_pretty()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmSpec {
    pub channels: u16,
    pub sample_rate: u32,
    /// Bytes per sample.
    pub sample_width: u16,
}

impl Default for PcmSpec {
    fn default() -> Self {
        Self {
            channels: 1,
            sample_rate: 24_000,
            sample_width: 2,
        }
    }
}

/// Wrap raw PCM into a WAV container. Trailing bytes that do not form a
/// whole frame are dropped.
pub fn pcm_to_wav(pcm: &[u8], spec: PcmSpec) -> Result<Vec<u8>> {
    if spec.channels == 0 {
        bail!("PCM spec needs at least one channel");
    }
    let width = usize::from(spec.sample_width);
    if !matches!(width, 1 | 2 | 4) {
        bail!("Unsupported PCM sample width: {width} bytes");
    }
    let frame = width * usize::from(spec.channels);
    let usable = pcm.len() - pcm.len() % frame;
    if usable != pcm.len() {
        warn!(
            dropped = pcm.len() - usable,
            "Dropping trailing bytes that do not form a whole PCM frame"
        );
    }

    let wav_spec = hound::WavSpec {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.sample_width * 8,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::with_capacity(usable + 44));
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, wav_spec).context("Creating WAV writer")?;
        for sample in pcm[..usable].chunks_exact(width) {
            match sample {
                &[byte] => writer.write_sample((i16::from(byte) - 128) as i8)?,
                &[lo, hi] => writer.write_sample(i16::from_le_bytes([lo, hi]))?,
                &[a, b, c, d] => writer.write_sample(i32::from_le_bytes([a, b, c, d]))?,
                _ => unreachable!("chunk width is validated above"),
            }
        }
        writer.finalize().context("Finalizing WAV data")?;
    }
    Ok(cursor.into_inner())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pronunciation {
    pub translation: String,
    pub phonetic: String,
    pub audio_wav: Vec<u8>,
}

impl Pronunciation {
    pub fn audio_data_uri(&self) -> String {
        format!("data:audio/wav;base64,{}", STANDARD.encode(&self.audio_wav))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistOutcome<T> {
    Ready(T),
    /// The request failed; the string is what the user should see instead.
    Fallback(String),
}

impl<T> AssistOutcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, AssistOutcome::Ready(_))
    }
}

#[derive(Clone, Default)]
pub struct TranslationAssistant {
    translator: Option<Arc<dyn TextTranslator>>,
    pronouncer: Option<Arc<dyn WordPronouncer>>,
    text_fallback: String,
    word_fallback: String,
    pcm: PcmSpec,
}

impl std::fmt::Debug for TranslationAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationAssistant")
            .field("translator", &self.translator.is_some())
            .field("pronouncer", &self.pronouncer.is_some())
            .field("pcm", &self.pcm)
            .finish()
    }
}

impl TranslationAssistant {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            translator: None,
            pronouncer: None,
            text_fallback: config.text_fallback.clone(),
            word_fallback: config.word_fallback.clone(),
            pcm: PcmSpec {
                channels: config.pronunciation_channels,
                sample_rate: config.pronunciation_sample_rate,
                sample_width: config.pronunciation_sample_width,
            },
        }
    }

    pub fn with_translator(mut self, translator: Arc<dyn TextTranslator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn with_pronouncer(mut self, pronouncer: Arc<dyn WordPronouncer>) -> Self {
        self.pronouncer = Some(pronouncer);
        self
    }

    pub fn translate_text(&self, text: &str, hints: &Vocabulary) -> AssistOutcome<String> {
        if text.trim().is_empty() {
            return AssistOutcome::Ready(String::new());
        }
        let Some(translator) = &self.translator else {
            warn!("No text translator configured");
            return AssistOutcome::Fallback(self.text_fallback.clone());
        };
        match translator.translate(text, hints) {
            Ok(translation) => {
                info!(chars = text.chars().count(), hints = hints.len(), "Text translated");
                AssistOutcome::Ready(translation)
            }
            Err(err) => {
                warn!("Text translation failed: {err:#}");
                AssistOutcome::Fallback(self.text_fallback.clone())
            }
        }
    }

    pub fn pronounce_word(&self, word: &str) -> AssistOutcome<Pronunciation> {
        let Some(pronouncer) = &self.pronouncer else {
            warn!(word, "No word pronouncer configured");
            return AssistOutcome::Fallback(self.word_fallback.clone());
        };
        let result = pronouncer
            .pronounce(word)
            .and_then(|raw| self.package(raw));
        match result {
            Ok(pronunciation) => {
                debug!(word, bytes = pronunciation.audio_wav.len(), "Word pronounced");
                AssistOutcome::Ready(pronunciation)
            }
            Err(err) => {
                warn!(word, "Word pronunciation failed: {err:#}");
                AssistOutcome::Fallback(self.word_fallback.clone())
            }
        }
    }

    fn package(&self, raw: RawPronunciation) -> Result<Pronunciation> {
        let audio_wav = pcm_to_wav(&raw.pcm, self.pcm)?;
        Ok(Pronunciation {
            translation: raw.translation,
            phonetic: raw.phonetic,
            audio_wav,
        })
    }
}

#[derive(Debug, Clone)]
pub enum AssistRequest {
    TranslateText { text: String, hints: Vocabulary },
    PronounceWord { word: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistResult {
    Text(AssistOutcome<String>),
    Word {
        word: String,
        outcome: AssistOutcome<Pronunciation>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistReply {
    pub request_id: u64,
    pub result: AssistResult,
}

/// Runs assistant requests on background threads and collects the replies.
#[derive(Debug)]
pub struct AssistDispatcher {
    assistant: Arc<TranslationAssistant>,
    tx: Sender<AssistReply>,
    rx: Receiver<AssistReply>,
    next_id: u64,
}

impl AssistDispatcher {
    pub fn new(assistant: TranslationAssistant) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            assistant: Arc::new(assistant),
            tx,
            rx,
            next_id: 0,
        }
    }

    /// Queue a request and return its id. The reply arrives later through
    /// [`AssistDispatcher::poll`].
    pub fn submit(&mut self, request: AssistRequest) -> u64 {
        self.next_id = self.next_id.wrapping_add(1);
        let request_id = self.next_id;
        let assistant = Arc::clone(&self.assistant);
        let tx = self.tx.clone();
        debug!(request_id, ?request, "Dispatching assist request");

        let spawned = thread::Builder::new()
            .name(format!("assist-{request_id}"))
            .spawn({
                let request = request.clone();
                move || {
                    let result = run_request(&assistant, request);
                    let _ = tx.send(AssistReply { request_id, result });
                }
            });
        if let Err(err) = spawned {
            warn!(request_id, "Failed to spawn assist worker, running inline: {err}");
            let result = run_request(&self.assistant, request);
            let _ = self.tx.send(AssistReply { request_id, result });
        }
        request_id
    }

    /// Replies that have arrived so far, in completion order.
    pub fn poll(&self) -> Vec<AssistReply> {
        self.rx.try_iter().collect()
    }

    /// Block until the next reply arrives or `timeout` elapses.
    pub fn wait(&self, timeout: Duration) -> Option<AssistReply> {
        self.rx.recv_timeout(timeout).ok()
    }
}

/// Run a request on the calling thread. A panicking provider is turned into
/// the fallback for the request kind so a reply is always produced.
fn run_request(assistant: &TranslationAssistant, request: AssistRequest) -> AssistResult {
    let fallback = match &request {
        AssistRequest::TranslateText { .. } => {
            AssistResult::Text(AssistOutcome::Fallback(assistant.text_fallback.clone()))
        }
        AssistRequest::PronounceWord { word } => AssistResult::Word {
            word: word.clone(),
            outcome: AssistOutcome::Fallback(assistant.word_fallback.clone()),
        },
    };
    match panic::catch_unwind(AssertUnwindSafe(|| dispatch_request(assistant, request))) {
        Ok(result) => result,
        Err(payload) => {
            warn!("Assist provider panicked: {}", panic_message(payload.as_ref()));
            fallback
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

fn dispatch_request(assistant: &TranslationAssistant, request: AssistRequest) -> AssistResult {
    match request {
        AssistRequest::TranslateText { text, hints } => {
            AssistResult::Text(assistant.translate_text(&text, &hints))
        }
        AssistRequest::PronounceWord { word } => {
            let outcome = assistant.pronounce_word(&word);
            AssistResult::Word { word, outcome }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    pub(crate) struct EchoTranslator {
        pub(crate) calls: AtomicUsize,
    }

    impl TextTranslator for EchoTranslator {
        fn translate(&self, text: &str, hints: &Vocabulary) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("fa:{text}:{}", hints.len()))
        }
    }

    pub(crate) struct FailingTranslator;

    impl TextTranslator for FailingTranslator {
        fn translate(&self, _text: &str, _hints: &Vocabulary) -> Result<String> {
            Err(anyhow!("quota exceeded"))
        }
    }

    pub(crate) struct PanickingTranslator;

    impl TextTranslator for PanickingTranslator {
        fn translate(&self, _text: &str, _hints: &Vocabulary) -> Result<String> {
            panic!("provider crashed");
        }
    }

    pub(crate) struct PanickingPronouncer;

    impl WordPronouncer for PanickingPronouncer {
        fn pronounce(&self, _word: &str) -> Result<RawPronunciation> {
            panic!("provider crashed");
        }
    }

    pub(crate) struct FixedPronouncer;

    impl WordPronouncer for FixedPronouncer {
        fn pronounce(&self, word: &str) -> Result<RawPronunciation> {
            Ok(RawPronunciation {
                translation: format!("fa:{word}"),
                phonetic: "privet".to_string(),
                pcm: vec![0, 0, 255, 127, 1, 128],
            })
        }
    }

    fn assistant() -> TranslationAssistant {
        TranslationAssistant::new(&AppConfig::default())
    }

    #[test]
    fn hints_render_as_pretty_json() {
        let hints: Vocabulary = [("мир", "جهان")].into_iter().collect();
        assert_eq!(hints_json(&hints).unwrap(), "{\n  \"мир\": \"جهان\"\n}");
        assert_eq!(hints_json(&Vocabulary::new()).unwrap(), "{}");
    }

    #[test]
    fn provider_panics_still_produce_a_reply() {
        let config = AppConfig::default();
        let assistant = assistant()
            .with_translator(Arc::new(PanickingTranslator))
            .with_pronouncer(Arc::new(PanickingPronouncer));
        let mut dispatcher = AssistDispatcher::new(assistant);

        let text_id = dispatcher.submit(AssistRequest::TranslateText {
            text: "Привет".to_string(),
            hints: Vocabulary::new(),
        });
        let reply = dispatcher.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(reply.request_id, text_id);
        assert_eq!(
            reply.result,
            AssistResult::Text(AssistOutcome::Fallback(config.text_fallback.clone()))
        );

        dispatcher.submit(AssistRequest::PronounceWord {
            word: "мир".to_string(),
        });
        let reply = dispatcher.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(
            reply.result,
            AssistResult::Word {
                word: "мир".to_string(),
                outcome: AssistOutcome::Fallback(config.word_fallback),
            }
        );
    }

    #[test]
    fn blank_text_skips_the_provider() {
        let translator = Arc::new(EchoTranslator::default());
        let assistant = assistant().with_translator(translator.clone());

        let outcome = assistant.translate_text(" \n ", &Vocabulary::new());

        assert_eq!(outcome, AssistOutcome::Ready(String::new()));
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn hints_are_passed_to_the_provider() {
        let assistant = assistant().with_translator(Arc::new(EchoTranslator::default()));
        let hints: Vocabulary = [("мир", "جهان")].into_iter().collect();

        let outcome = assistant.translate_text("мир", &hints);

        assert_eq!(outcome, AssistOutcome::Ready("fa:мир:1".to_string()));
    }

    #[test]
    fn provider_failure_becomes_fallback() {
        let assistant = assistant().with_translator(Arc::new(FailingTranslator));

        let outcome = assistant.translate_text("мир", &Vocabulary::new());

        assert_eq!(
            outcome,
            AssistOutcome::Fallback(AppConfig::default().text_fallback)
        );
    }

    #[test]
    fn missing_pronouncer_becomes_fallback() {
        assert!(!assistant().pronounce_word("мир").is_ready());
    }

    #[test]
    fn pronunciation_is_packaged_as_wav() {
        let assistant = assistant().with_pronouncer(Arc::new(FixedPronouncer));

        let AssistOutcome::Ready(pronunciation) = assistant.pronounce_word("привет") else {
            panic!("expected a pronunciation");
        };

        assert_eq!(pronunciation.translation, "fa:привет");
        assert_eq!(&pronunciation.audio_wav[..4], b"RIFF");
        assert!(pronunciation.audio_data_uri().starts_with("data:audio/wav;base64,UklGR"));

        let reader = hound::WavReader::new(Cursor::new(pronunciation.audio_wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, 24_000);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 32767, -32767]);
    }

    #[test]
    fn partial_frames_are_dropped() {
        let wav = pcm_to_wav(&[1, 0, 2], PcmSpec::default()).unwrap();
        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.len(), 1);
    }

    #[test]
    fn unsupported_sample_width_is_an_error() {
        let spec = PcmSpec {
            sample_width: 3,
            ..PcmSpec::default()
        };
        assert!(pcm_to_wav(&[0, 0, 0], spec).is_err());
    }

    #[test]
    fn dispatcher_delivers_tagged_replies() {
        let assistant = assistant().with_translator(Arc::new(EchoTranslator::default()));
        let mut dispatcher = AssistDispatcher::new(assistant);

        let request_id = dispatcher.submit(AssistRequest::TranslateText {
            text: "да".to_string(),
            hints: Vocabulary::new(),
        });
        let reply = dispatcher.wait(Duration::from_secs(5)).unwrap();

        assert_eq!(reply.request_id, request_id);
        assert_eq!(
            reply.result,
            AssistResult::Text(AssistOutcome::Ready("fa:да:0".to_string()))
        );
        assert!(dispatcher.poll().is_empty());
    }
}
