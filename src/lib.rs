#![forbid(unsafe_code)]

pub mod capture;
pub mod core;
pub mod demo;
pub mod encode_ffmpeg;
pub mod error;
pub mod options;
pub mod png_sequence;
pub mod query;
pub mod session;
pub mod sketch;
pub mod storage;

pub use capture::{CaptureCall, FrameCapturer, InMemoryCapturer, create_capturer};
pub use core::{Canvas, Fps, FrameIndex, FrameRGBA};
pub use demo::{RunPlan, RunReport, run_spinning_bar};
pub use encode_ffmpeg::{FfmpegCapturer, VideoConfig, is_ffmpeg_on_path};
pub use error::{SketchError, SketchResult};
pub use options::{CaptureFormat, ExportSettings, PlaybackHooks};
pub use png_sequence::PngSequenceCapturer;
pub use query::QueryParams;
pub use session::{FrameLoop, SketchSession, TrackMode, Tracked};
pub use sketch::{ANGLE_VAR, SpinningBar};
pub use storage::{
    FileStore, KeyValueStore, MemoryStore, RECORD_STORAGE_KEY, SeriesMap, load_series,
    save_series,
};
