use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    capture::FrameCapturer,
    core::{Canvas, FrameRGBA},
    error::{SketchError, SketchResult},
};

/// Writes each captured frame as `frame-NNNNN.png` into a directory.
#[derive(Debug)]
pub struct PngSequenceCapturer {
    dir: PathBuf,
    canvas: Canvas,
    verbose: bool,
    started: bool,
    next: u64,
}

impl PngSequenceCapturer {
    pub fn new(dir: impl Into<PathBuf>, canvas: Canvas, verbose: bool) -> Self {
        Self {
            dir: dir.into(),
            canvas,
            verbose,
            started: false,
            next: 0,
        }
    }

    pub fn frame_path(dir: &Path, n: u64) -> PathBuf {
        dir.join(format!("frame-{n:05}.png"))
    }

    pub fn frames_written(&self) -> u64 {
        self.next
    }
}

impl FrameCapturer for PngSequenceCapturer {
    fn start(&mut self) -> SketchResult<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create png output dir '{}'", self.dir.display()))?;
        self.started = true;
        self.next = 0;
        tracing::debug!(dir = %self.dir.display(), "png sequence capture started");
        Ok(())
    }

    fn capture(&mut self, surface: &FrameRGBA) -> SketchResult<()> {
        if !self.started {
            return Err(SketchError::capture("png capturer is not running"));
        }
        if surface.canvas() != self.canvas || surface.data.len() != self.canvas.byte_len() {
            return Err(SketchError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                surface.width, surface.height, self.canvas.width, self.canvas.height
            )));
        }

        let data = if surface.premultiplied {
            Cow::Owned(unpremultiply(&surface.data))
        } else {
            Cow::Borrowed(surface.data.as_slice())
        };

        let path = Self::frame_path(&self.dir, self.next);
        image::save_buffer_with_format(
            &path,
            &data,
            surface.width,
            surface.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;

        if self.verbose {
            tracing::trace!(path = %path.display(), "frame written");
        }
        self.next += 1;
        Ok(())
    }

    fn save(&mut self) -> SketchResult<()> {
        if !self.started {
            return Err(SketchError::capture("png capturer is not running"));
        }
        tracing::debug!(
            frames = self.next,
            dir = %self.dir.display(),
            "png sequence saved"
        );
        Ok(())
    }

    fn stop(&mut self) -> SketchResult<()> {
        self.started = false;
        Ok(())
    }
}

fn unpremultiply(src: &[u8]) -> Vec<u8> {
    let mut out = src.to_vec();
    for px in out.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_numbered_frames() {
        let dir = PathBuf::from("target").join("png_sequence_unit");
        let _ = std::fs::remove_dir_all(&dir);
        let canvas = Canvas {
            width: 4,
            height: 3,
        };

        let mut c = PngSequenceCapturer::new(&dir, canvas, false);
        c.start().unwrap();
        c.capture(&FrameRGBA::filled(canvas, [10, 20, 30, 255])).unwrap();
        c.capture(&FrameRGBA::filled(canvas, [40, 50, 60, 255])).unwrap();
        c.save().unwrap();
        c.stop().unwrap();

        assert_eq!(c.frames_written(), 2);
        let img = image::open(PngSequenceCapturer::frame_path(&dir, 1))
            .unwrap()
            .to_rgba8();
        assert_eq!(img.dimensions(), (4, 3));
        assert_eq!(img.get_pixel(0, 0).0, [40, 50, 60, 255]);
    }

    #[test]
    fn rejects_wrong_surface_size_and_unstarted_capture() {
        let canvas = Canvas {
            width: 4,
            height: 4,
        };
        let mut c = PngSequenceCapturer::new("target/png_sequence_reject", canvas, false);
        let f = FrameRGBA::filled(canvas, [0, 0, 0, 255]);
        assert!(c.capture(&f).is_err());

        c.start().unwrap();
        let small = FrameRGBA::filled(
            Canvas {
                width: 2,
                height: 2,
            },
            [0, 0, 0, 255],
        );
        assert!(c.capture(&small).is_err());
    }

    #[test]
    fn unpremultiply_restores_straight_alpha() {
        assert_eq!(unpremultiply(&[64, 0, 0, 128]), vec![128, 0, 0, 128]);
        assert_eq!(unpremultiply(&[0, 0, 0, 0]), vec![0, 0, 0, 0]);
    }
}
