use std::fmt;

use crate::{
    core::Fps,
    error::{SketchError, SketchResult},
};

/// Container the capturer writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureFormat {
    #[default]
    Webm,
    Mp4,
    /// One PNG file per captured frame.
    Png,
}

impl CaptureFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Webm => "webm",
            Self::Mp4 => "mp4",
            Self::Png => "png",
        }
    }
}

/// User-facing export settings.
///
/// Missing keys fall back to defaults and unknown keys are ignored, so settings written for a
/// newer version still load.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub format: CaptureFormat,
    /// Passed through to the capturer's own logging.
    pub verbose: bool,
    /// Frame rate for both the encoder and playback pacing.
    pub fps: u32,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: CaptureFormat::Webm,
            verbose: true,
            fps: 30,
        }
    }
}

impl ExportSettings {
    pub fn from_json(s: &str) -> SketchResult<Self> {
        serde_json::from_str(s).map_err(|e| SketchError::serde(format!("export settings: {e}")))
    }

    pub fn fps(&self) -> SketchResult<Fps> {
        Fps::new(self.fps)
    }
}

pub type Hook = Box<dyn FnMut()>;

/// Lifecycle callbacks fired synchronously from the frame loop.
#[derive(Default)]
pub struct PlaybackHooks {
    pub on_playback_start: Option<Hook>,
    pub on_playback_end: Option<Hook>,
}

impl PlaybackHooks {
    pub fn on_playback_start(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_playback_start = Some(Box::new(f));
        self
    }

    pub fn on_playback_end(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_playback_end = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for PlaybackHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackHooks")
            .field("on_playback_start", &self.on_playback_start.is_some())
            .field("on_playback_end", &self.on_playback_end.is_some())
            .finish()
    }
}
