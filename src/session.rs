//! Export/record/playback session driven by the host's per-frame tick.
//!
//! Per frame the host calls, in order:
//! 1. [`SketchSession::record_or_play`] for every tracked variable,
//! 2. [`SketchSession::capture_frame`] with the rendered surface,
//! 3. optionally [`SketchSession::start_export`], [`SketchSession::end_export`] or
//!    [`SketchSession::record_stop`] at frames of its choosing.
//!
//! Playback substitutions therefore land in the frame that gets captured.

use std::collections::BTreeMap;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    capture::FrameCapturer,
    core::{Fps, FrameIndex, FrameRGBA},
    error::SketchResult,
    options::{ExportSettings, Hook, PlaybackHooks},
    query::QueryParams,
    storage::{KeyValueStore, SeriesMap, load_series, save_series},
};

/// Whether the host should keep advancing frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub enum FrameLoop {
    Continue,
    Halt,
}

/// Per-variable state; fixed at configure time apart from `Playing -> PlayingExhausted`.
#[derive(Clone, Debug, PartialEq)]
pub enum Tracked {
    Inactive,
    Recording(Vec<Value>),
    Playing(Vec<Value>),
    /// Terminal: the series ran out, live values pass through.
    PlayingExhausted(Vec<Value>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackMode {
    Inactive,
    Record,
    Play,
}

impl Tracked {
    pub fn mode(&self) -> TrackMode {
        match self {
            Self::Inactive => TrackMode::Inactive,
            Self::Recording(_) => TrackMode::Record,
            Self::Playing(_) | Self::PlayingExhausted(_) => TrackMode::Play,
        }
    }

    pub fn series(&self) -> Option<&[Value]> {
        match self {
            Self::Inactive => None,
            Self::Recording(s) | Self::Playing(s) | Self::PlayingExhausted(s) => Some(s),
        }
    }
}

pub struct SketchSession {
    settings: ExportSettings,
    fps: Fps,
    export_enabled: bool,
    record_enabled: bool,
    playback_enabled: bool,
    playback_ended: bool,
    playback_end_notified: bool,
    export_finished: bool,
    record_flushed: bool,
    recording_started_at: Option<FrameIndex>,
    vars: BTreeMap<String, Tracked>,
    on_playback_end: Option<Hook>,
    capturer: Box<dyn FrameCapturer>,
}

impl std::fmt::Debug for SketchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SketchSession")
            .field("settings", &self.settings)
            .field("export_enabled", &self.export_enabled)
            .field("record_enabled", &self.record_enabled)
            .field("playback_enabled", &self.playback_enabled)
            .field("playback_ended", &self.playback_ended)
            .field("vars", &self.vars)
            .finish_non_exhaustive()
    }
}

impl SketchSession {
    /// Build a session from settings, start-up query and previously saved series.
    ///
    /// Only an invalid frame rate is an error. Missing or unreadable storage and unknown names
    /// degrade to an inert session with diagnostics. `on_playback_start` fires here, once, when
    /// at least one variable enters playback.
    #[tracing::instrument(skip_all, fields(query = ?query))]
    pub fn configure(
        settings: ExportSettings,
        hooks: PlaybackHooks,
        query: &QueryParams,
        storage: &dyn KeyValueStore,
        capturer: Box<dyn FrameCapturer>,
    ) -> SketchResult<Self> {
        let fps = settings.fps()?;
        let PlaybackHooks {
            on_playback_start,
            on_playback_end,
        } = hooks;

        let mut session = Self {
            settings,
            fps,
            export_enabled: query.export(),
            record_enabled: false,
            playback_enabled: false,
            playback_ended: false,
            playback_end_notified: false,
            export_finished: false,
            record_flushed: false,
            recording_started_at: None,
            vars: BTreeMap::new(),
            on_playback_end,
            capturer,
        };

        for name in query.record() {
            tracing::debug!(%name, "recording variable");
            session.vars.insert(name, Tracked::Recording(Vec::new()));
            session.record_enabled = true;
        }
        if session.record_enabled && session.export_enabled {
            tracing::debug!("export disabled while recording");
            session.export_enabled = false;
        }

        let play = query.play();
        if !play.is_empty() {
            let stored = match load_series(storage) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring unreadable recorded series");
                    None
                }
            };

            match stored {
                // Without a saved map, names that are also recorded keep recording.
                None => {
                    tracing::debug!("no recorded series in storage");
                    for name in play {
                        if !session.vars.contains_key(&name) {
                            tracing::debug!(
                                %name,
                                "missing recorded series; record it first with ?record={name}"
                            );
                            session.vars.insert(name, Tracked::Inactive);
                        }
                    }
                }
                // A saved map makes playback take precedence over recording.
                Some(mut stored) => {
                    for name in play {
                        if matches!(session.vars.get(&name), Some(Tracked::Recording(_))) {
                            tracing::debug!(%name, "playback replaces recording");
                        }
                        match stored.remove(&name) {
                            Some(series) if !series.is_empty() => {
                                tracing::debug!(%name, frames = series.len(), "playing variable");
                                session.vars.insert(name, Tracked::Playing(series));
                                session.playback_enabled = true;
                            }
                            _ => {
                                tracing::debug!(
                                    %name,
                                    "missing recorded series; record it first with ?record={name}"
                                );
                                session.vars.insert(name, Tracked::Inactive);
                            }
                        }
                    }
                }
            }
        }

        if session.playback_enabled
            && let Some(mut f) = on_playback_start
        {
            f();
        }

        Ok(session)
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    pub fn export_enabled(&self) -> bool {
        self.export_enabled
    }

    pub fn record_enabled(&self) -> bool {
        self.record_enabled
    }

    /// `true` while at least one variable still has stored frames ahead.
    pub fn playback_enabled(&self) -> bool {
        self.playback_enabled
    }

    /// Sticky once any playing variable ran out of stored frames.
    pub fn playback_ended(&self) -> bool {
        self.playback_ended
    }

    pub fn tracked(&self, name: &str) -> Option<&Tracked> {
        self.vars.get(name)
    }

    pub fn recording_started_at(&self) -> Option<FrameIndex> {
        self.recording_started_at
    }

    /// Record `value` or substitute the stored value for `frame`.
    pub fn record_or_play(&mut self, name: &str, frame: FrameIndex, value: Value) -> Value {
        let Some(var) = self.vars.get_mut(name) else {
            return value;
        };

        match var {
            Tracked::Inactive | Tracked::PlayingExhausted(_) => value,
            Tracked::Recording(series) => {
                series.push(value.clone());
                value
            }
            Tracked::Playing(series) => {
                if let Some(stored) = frame.as_usize().and_then(|i| series.get(i)) {
                    return stored.clone();
                }
                let series = std::mem::take(series);
                tracing::debug!(%name, frame = frame.0, "playback series exhausted");
                *var = Tracked::PlayingExhausted(series);
                self.playback_ended = true;
                self.playback_enabled = self
                    .vars
                    .values()
                    .any(|v| matches!(v, Tracked::Playing(_)));
                value
            }
        }
    }

    /// Typed wrapper over [`Self::record_or_play`].
    ///
    /// A stored entry that does not deserialize as `T`, or a live value that does not
    /// serialize, falls back to the live value.
    pub fn record_or_play_as<T>(&mut self, name: &str, frame: FrameIndex, value: T) -> T
    where
        T: Serialize + DeserializeOwned,
    {
        if !self.vars.contains_key(name) {
            return value;
        }
        let live = match serde_json::to_value(&value) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(%name, error = %e, "value is not serializable; passing through");
                return value;
            }
        };
        let out = self.record_or_play(name, frame, live);
        match serde_json::from_value(out) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(%name, error = %e, "stored value has the wrong shape; using live value");
                value
            }
        }
    }

    /// Hand the rendered surface to the capturer when exporting.
    ///
    /// `on_playback_end` fires here, once, the first time this runs after a variable read
    /// found its series exhausted.
    pub fn capture_frame(&mut self, frame: FrameIndex, surface: &FrameRGBA) -> SketchResult<()> {
        if !self.export_enabled || self.export_finished {
            return Ok(());
        }
        self.capturer.capture(surface)?;
        tracing::trace!(frame = frame.0, "frame captured");

        if self.playback_ended && !self.playback_end_notified {
            self.playback_end_notified = true;
            tracing::debug!(frame = frame.0, "playback ended");
            if let Some(f) = self.on_playback_end.as_mut() {
                f();
            }
        }
        Ok(())
    }

    pub fn start_export(&mut self) -> SketchResult<()> {
        if !self.export_enabled || self.export_finished {
            return Ok(());
        }
        self.capturer.start()?;
        tracing::debug!(format = ?self.settings.format, fps = self.fps.get(), "export started");
        Ok(())
    }

    /// Finalize the export; the host should stop its frame loop on [`FrameLoop::Halt`].
    pub fn end_export(&mut self) -> SketchResult<FrameLoop> {
        if !self.export_enabled || self.export_finished {
            return Ok(FrameLoop::Continue);
        }
        self.export_finished = true;
        self.capturer.save()?;
        self.capturer.stop()?;
        tracing::debug!("export ended");
        Ok(FrameLoop::Halt)
    }

    /// Mark the frame recording starts at.
    pub fn record_start(&mut self, frame: FrameIndex) {
        if self.export_enabled || !self.record_enabled || self.record_flushed {
            return;
        }
        self.recording_started_at = Some(frame);
        tracing::debug!(frame = frame.0, "recording started");
    }

    /// Flush the session's series map to storage, once; the host should stop on
    /// [`FrameLoop::Halt`].
    ///
    /// Played series are written back unchanged next to the recorded ones, so a run that
    /// records one variable while replaying another keeps both.
    pub fn record_stop(&mut self, storage: &mut dyn KeyValueStore) -> SketchResult<FrameLoop> {
        if self.export_enabled || !self.record_enabled || self.record_flushed {
            return Ok(FrameLoop::Continue);
        }
        self.record_flushed = true;

        let series: SeriesMap = self
            .vars
            .iter()
            .filter_map(|(name, v)| v.series().map(|s| (name.clone(), s.to_vec())))
            .collect();
        save_series(storage, &series)?;
        tracing::debug!(
            variables = series.len(),
            started_at = ?self.recording_started_at.map(|f| f.0),
            "recording stopped; storage saved"
        );
        Ok(FrameLoop::Halt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{capture::InMemoryCapturer, storage::MemoryStore};

    fn session(query: &str, storage: &dyn KeyValueStore) -> SketchSession {
        SketchSession::configure(
            ExportSettings::default(),
            PlaybackHooks::default(),
            &QueryParams::parse(query),
            storage,
            Box::new(InMemoryCapturer::new()),
        )
        .unwrap()
    }

    #[test]
    fn tracked_mode_and_series() {
        assert_eq!(Tracked::Inactive.mode(), TrackMode::Inactive);
        assert_eq!(Tracked::Recording(vec![]).mode(), TrackMode::Record);
        assert_eq!(
            Tracked::PlayingExhausted(vec![Value::from(1)]).mode(),
            TrackMode::Play
        );
        assert_eq!(Tracked::Inactive.series(), None);
    }

    #[test]
    fn zero_fps_fails_configure() {
        let err = SketchSession::configure(
            ExportSettings {
                fps: 0,
                ..ExportSettings::default()
            },
            PlaybackHooks::default(),
            &QueryParams::default(),
            &MemoryStore::new(),
            Box::new(InMemoryCapturer::new()),
        );
        assert!(err.is_err());
    }

    #[test]
    fn typed_wrapper_substitutes_and_falls_back() {
        let mut store = MemoryStore::new();
        let mut series = SeriesMap::new();
        series.insert("x".to_string(), vec![Value::from(7.5), Value::from("oops")]);
        save_series(&mut store, &series).unwrap();

        let mut s = session("?play=x", &store);
        assert_eq!(s.record_or_play_as("x", FrameIndex(0), 1.0f64), 7.5);
        assert_eq!(s.record_or_play_as("x", FrameIndex(1), 2.0f64), 2.0);
        assert!(!s.playback_ended());
        assert_eq!(s.record_or_play_as("untracked", FrameIndex(0), 3u32), 3);
    }

    #[test]
    fn name_in_both_lists_plays_when_series_is_stored() {
        let mut store = MemoryStore::new();
        let mut series = SeriesMap::new();
        series.insert("x".to_string(), vec![Value::from(1)]);
        save_series(&mut store, &series).unwrap();

        let mut s = session("?record=x&play=x", &store);
        assert_eq!(s.tracked("x").map(Tracked::mode), Some(TrackMode::Play));
        assert!(s.playback_enabled());
        assert_eq!(s.record_or_play("x", FrameIndex(0), Value::from(42)), Value::from(1));
    }

    #[test]
    fn name_in_both_lists_keeps_recording_without_stored_map() {
        let s = session("?record=x&play=x", &MemoryStore::new());
        assert_eq!(s.tracked("x").map(Tracked::mode), Some(TrackMode::Record));
        assert!(!s.playback_enabled());
    }

    #[test]
    fn unreadable_storage_yields_inactive_variables() {
        let mut store = MemoryStore::new();
        store
            .set_item(crate::storage::RECORD_STORAGE_KEY, "not json")
            .unwrap();
        let s = session("?play=x", &store);
        assert_eq!(s.tracked("x"), Some(&Tracked::Inactive));
        assert!(!s.playback_enabled());
    }

    #[test]
    fn playback_stays_enabled_until_every_variable_is_exhausted() {
        let mut store = MemoryStore::new();
        let mut series = SeriesMap::new();
        series.insert("a".to_string(), vec![Value::from(1)]);
        series.insert("b".to_string(), vec![Value::from(1), Value::from(2)]);
        save_series(&mut store, &series).unwrap();

        let mut s = session("?play=a,b", &store);
        let _ = s.record_or_play("a", FrameIndex(1), Value::from(0));
        let _ = s.record_or_play("b", FrameIndex(1), Value::from(0));
        assert!(s.playback_ended());
        assert!(s.playback_enabled());

        let _ = s.record_or_play("b", FrameIndex(2), Value::from(0));
        assert!(!s.playback_enabled());
    }
}
