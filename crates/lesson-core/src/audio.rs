//! Playback clamped to a lesson's `[start, end)` audio window.
//!
//! The controller is a pure reducer over media element events. It never
//! touches the player itself; every event returns the seeks the host must
//! perform, so the same logic drives a browser `<audio>` element and the
//! command-line player.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct PlaybackWindow {
    pub start: f64,
    pub end: Option<f64>,
}

impl PlaybackWindow {
    /// Build a window from a lesson's optional bounds.
    ///
    /// A missing start means 0 and a missing end means "play to the end of the
    /// file". Returns `None` (unbound playback) when neither bound is usable or
    /// when the window is empty or inverted.
    pub fn from_bounds(start: Option<f64>, end: Option<f64>) -> Option<Self> {
        let start = start.filter(|value| {
            let usable = value.is_finite() && *value >= 0.0;
            if !usable {
                warn!(start = value, "Ignoring unusable audio start time");
            }
            usable
        });
        let end = end.filter(|value| {
            let usable = value.is_finite();
            if !usable {
                warn!(end = value, "Ignoring unusable audio end time");
            }
            usable
        });
        if start.is_none() && end.is_none() {
            return None;
        }

        let start_secs = start.unwrap_or(0.0);
        if let Some(end_secs) = end {
            if end_secs <= start_secs {
                warn!(
                    start = start_secs,
                    end = end_secs,
                    "Audio window end is not after start; playing the whole file"
                );
                return None;
            }
        }
        Some(Self {
            start: start_secs,
            end,
        })
    }

    pub fn is_past_end(&self, position: f64) -> bool {
        self.end.is_some_and(|end| position >= end)
    }

    pub fn duration(&self) -> Option<f64> {
        self.end.map(|end| end - self.start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioState {
    Unbound,
    Windowed(PlaybackWindow),
}

/// Events raised by a playable media element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum MediaEvent {
    /// A new source or new bounds were attached to the element.
    SourceChanged {
        start: Option<f64>,
        end: Option<f64>,
    },
    LoadedMetadata,
    Play {
        position: f64,
    },
    TimeUpdate {
        position: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaAction {
    Seek(f64),
}

#[derive(Debug, Clone)]
pub struct SegmentedAudioController {
    state: AudioState,
    metadata_armed: bool,
    loops: u64,
}

impl Default for SegmentedAudioController {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl SegmentedAudioController {
    pub fn new(start: Option<f64>, end: Option<f64>) -> Self {
        Self {
            state: state_for(start, end),
            metadata_armed: true,
            loops: 0,
        }
    }

    pub fn state(&self) -> AudioState {
        self.state
    }

    pub fn window(&self) -> Option<PlaybackWindow> {
        match self.state {
            AudioState::Unbound => None,
            AudioState::Windowed(window) => Some(window),
        }
    }

    /// How many times playback wrapped from `end` back to `start` since the
    /// source was attached.
    pub fn loops(&self) -> u64 {
        self.loops
    }

    pub fn transition(&mut self, event: MediaEvent) -> Vec<MediaAction> {
        match event {
            MediaEvent::SourceChanged { start, end } => {
                self.state = state_for(start, end);
                self.metadata_armed = true;
                self.loops = 0;
                debug!(state = ?self.state, "Audio source changed; window re-armed");
                Vec::new()
            }
            MediaEvent::LoadedMetadata => self.on_loaded_metadata(),
            MediaEvent::Play { position } => self.on_play(position),
            MediaEvent::TimeUpdate { position } => self.on_time_update(position),
        }
    }

    fn on_loaded_metadata(&mut self) -> Vec<MediaAction> {
        let AudioState::Windowed(window) = self.state else {
            return Vec::new();
        };
        if !self.metadata_armed {
            return Vec::new();
        }
        self.metadata_armed = false;
        debug!(start = window.start, "Metadata loaded; seeking to window start");
        vec![MediaAction::Seek(window.start)]
    }

    fn on_play(&mut self, position: f64) -> Vec<MediaAction> {
        let AudioState::Windowed(window) = self.state else {
            return Vec::new();
        };
        if position < window.start || window.is_past_end(position) {
            debug!(position, start = window.start, "Play outside window; seeking to start");
            return vec![MediaAction::Seek(window.start)];
        }
        Vec::new()
    }

    fn on_time_update(&mut self, position: f64) -> Vec<MediaAction> {
        let AudioState::Windowed(window) = self.state else {
            return Vec::new();
        };
        if window.is_past_end(position) {
            self.loops += 1;
            debug!(position, loops = self.loops, "Reached window end; looping");
            return vec![MediaAction::Seek(window.start)];
        }
        Vec::new()
    }
}

fn state_for(start: Option<f64>, end: Option<f64>) -> AudioState {
    match PlaybackWindow::from_bounds(start, end) {
        Some(window) => AudioState::Windowed(window),
        None => AudioState::Unbound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seek(to: f64) -> Vec<MediaAction> {
        vec![MediaAction::Seek(to)]
    }

    #[test]
    fn windowed_playback_loops_back_to_start() {
        let mut audio = SegmentedAudioController::new(Some(30.0), Some(45.0));

        assert_eq!(audio.transition(MediaEvent::LoadedMetadata), seek(30.0));
        assert!(audio.transition(MediaEvent::TimeUpdate { position: 44.9 }).is_empty());
        assert_eq!(audio.transition(MediaEvent::TimeUpdate { position: 46.0 }), seek(30.0));
        assert_eq!(audio.loops(), 1);
    }

    #[test]
    fn end_bound_is_exclusive() {
        let mut audio = SegmentedAudioController::new(Some(30.0), Some(45.0));
        assert_eq!(audio.transition(MediaEvent::TimeUpdate { position: 45.0 }), seek(30.0));
    }

    #[test]
    fn play_outside_window_seeks_to_start() {
        let mut audio = SegmentedAudioController::new(Some(10.0), Some(20.0));

        assert_eq!(audio.transition(MediaEvent::Play { position: 2.0 }), seek(10.0));
        assert_eq!(audio.transition(MediaEvent::Play { position: 20.0 }), seek(10.0));
        assert!(audio.transition(MediaEvent::Play { position: 12.0 }).is_empty());
    }

    #[test]
    fn start_only_window_plays_to_natural_end() {
        let mut audio = SegmentedAudioController::new(Some(5.0), None);

        assert_eq!(audio.transition(MediaEvent::LoadedMetadata), seek(5.0));
        assert!(audio.transition(MediaEvent::TimeUpdate { position: 9_999.0 }).is_empty());
        assert_eq!(audio.transition(MediaEvent::Play { position: 1.0 }), seek(5.0));
    }

    #[test]
    fn end_only_window_starts_at_zero() {
        let mut audio = SegmentedAudioController::new(None, Some(8.0));
        assert_eq!(
            audio.window(),
            Some(PlaybackWindow {
                start: 0.0,
                end: Some(8.0)
            })
        );
        assert_eq!(audio.transition(MediaEvent::TimeUpdate { position: 8.5 }), seek(0.0));
    }

    #[test]
    fn unbound_controller_never_seeks() {
        let mut audio = SegmentedAudioController::new(None, None);

        assert_eq!(audio.state(), AudioState::Unbound);
        assert!(audio.transition(MediaEvent::LoadedMetadata).is_empty());
        assert!(audio.transition(MediaEvent::Play { position: 0.0 }).is_empty());
        assert!(audio.transition(MediaEvent::TimeUpdate { position: 500.0 }).is_empty());
    }

    #[test]
    fn inverted_or_empty_window_is_unbound() {
        assert_eq!(
            SegmentedAudioController::new(Some(45.0), Some(30.0)).state(),
            AudioState::Unbound
        );
        assert_eq!(
            SegmentedAudioController::new(Some(30.0), Some(30.0)).state(),
            AudioState::Unbound
        );
    }

    #[test]
    fn non_finite_bounds_are_ignored() {
        assert_eq!(
            SegmentedAudioController::new(Some(f64::NAN), Some(f64::INFINITY)).state(),
            AudioState::Unbound
        );
        assert_eq!(
            PlaybackWindow::from_bounds(Some(-3.0), Some(4.0)),
            Some(PlaybackWindow {
                start: 0.0,
                end: Some(4.0)
            })
        );
    }

    #[test]
    fn metadata_seek_happens_once_per_source() {
        let mut audio = SegmentedAudioController::new(Some(30.0), Some(45.0));
        assert_eq!(audio.transition(MediaEvent::LoadedMetadata), seek(30.0));
        assert!(audio.transition(MediaEvent::LoadedMetadata).is_empty());

        audio.transition(MediaEvent::SourceChanged {
            start: Some(3.0),
            end: None,
        });
        assert_eq!(audio.transition(MediaEvent::LoadedMetadata), seek(3.0));
    }

    #[test]
    fn source_change_resets_loop_count_and_bounds() {
        let mut audio = SegmentedAudioController::new(Some(0.0), Some(1.0));
        audio.transition(MediaEvent::TimeUpdate { position: 1.5 });
        assert_eq!(audio.loops(), 1);

        audio.transition(MediaEvent::SourceChanged {
            start: None,
            end: None,
        });

        assert_eq!(audio.loops(), 0);
        assert_eq!(audio.state(), AudioState::Unbound);
    }

    #[test]
    fn media_events_deserialize_from_tagged_json() {
        let event: MediaEvent =
            serde_json::from_str(r#"{ "type": "time_update", "position": 12.5 }"#).unwrap();
        assert_eq!(event, MediaEvent::TimeUpdate { position: 12.5 });
    }
}
