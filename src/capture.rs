use std::path::Path;

use crate::{
    core::{Canvas, FrameRGBA},
    encode_ffmpeg::{FfmpegCapturer, VideoConfig},
    error::SketchResult,
    options::{CaptureFormat, ExportSettings},
    png_sequence::PngSequenceCapturer,
};

/// External capturing collaborator.
///
/// Call order contract: `start`, then `capture` once per exported frame, then `save`, then
/// `stop`. The session never calls `capture` before `start`.
pub trait FrameCapturer {
    fn start(&mut self) -> SketchResult<()>;
    fn capture(&mut self, surface: &FrameRGBA) -> SketchResult<()>;
    /// Finalize the output written so far.
    fn save(&mut self) -> SketchResult<()>;
    /// Release resources; no further frames are accepted.
    fn stop(&mut self) -> SketchResult<()>;
}

/// Lifecycle call observed by [`InMemoryCapturer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureCall {
    Start,
    Capture,
    Save,
    Stop,
}

/// In-memory capturer for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemoryCapturer {
    pub calls: Vec<CaptureCall>,
    /// Captured frames in call order.
    pub frames: Vec<FrameRGBA>,
}

impl InMemoryCapturer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameCapturer for InMemoryCapturer {
    fn start(&mut self) -> SketchResult<()> {
        self.calls.push(CaptureCall::Start);
        self.frames.clear();
        Ok(())
    }

    fn capture(&mut self, surface: &FrameRGBA) -> SketchResult<()> {
        self.calls.push(CaptureCall::Capture);
        self.frames.push(surface.clone());
        Ok(())
    }

    fn save(&mut self) -> SketchResult<()> {
        self.calls.push(CaptureCall::Save);
        Ok(())
    }

    fn stop(&mut self) -> SketchResult<()> {
        self.calls.push(CaptureCall::Stop);
        Ok(())
    }
}

/// Build the capturer selected by `settings.format`.
///
/// Video formats write to `out`; the PNG sequence treats `out` as a directory.
pub fn create_capturer(
    settings: &ExportSettings,
    canvas: Canvas,
    out: &Path,
) -> SketchResult<Box<dyn FrameCapturer>> {
    canvas.validate()?;
    let fps = settings.fps()?;
    match settings.format {
        CaptureFormat::Webm | CaptureFormat::Mp4 => {
            let cfg = VideoConfig {
                format: settings.format,
                width: canvas.width,
                height: canvas.height,
                fps,
                out_path: out.to_path_buf(),
                overwrite: true,
                verbose: settings.verbose,
            };
            cfg.validate()?;
            Ok(Box::new(FfmpegCapturer::new(cfg, [0, 0, 0, 255])))
        }
        CaptureFormat::Png => Ok(Box::new(PngSequenceCapturer::new(
            out,
            canvas,
            settings.verbose,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_capturer_records_call_order() {
        let mut c = InMemoryCapturer::new();
        let f = FrameRGBA::filled(
            Canvas {
                width: 2,
                height: 2,
            },
            [0, 0, 0, 255],
        );
        c.start().unwrap();
        c.capture(&f).unwrap();
        c.save().unwrap();
        c.stop().unwrap();
        assert_eq!(
            c.calls,
            vec![
                CaptureCall::Start,
                CaptureCall::Capture,
                CaptureCall::Save,
                CaptureCall::Stop
            ]
        );
        assert_eq!(c.frames.len(), 1);
    }

    #[test]
    fn factory_rejects_odd_video_dimensions() {
        let settings = ExportSettings {
            format: CaptureFormat::Mp4,
            ..ExportSettings::default()
        };
        let canvas = Canvas {
            width: 11,
            height: 10,
        };
        assert!(create_capturer(&settings, canvas, Path::new("target/odd.mp4")).is_err());
    }

    #[test]
    fn factory_builds_png_sequence_without_ffmpeg() {
        let settings = ExportSettings {
            format: CaptureFormat::Png,
            ..ExportSettings::default()
        };
        let canvas = Canvas {
            width: 11,
            height: 10,
        };
        assert!(create_capturer(&settings, canvas, Path::new("target/png_seq")).is_ok());
    }
}
