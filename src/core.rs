use crate::error::{SketchError, SketchResult};

/// Absolute 0-based frame index in sketch time.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

impl FrameIndex {
    /// Index into a per-frame series, when addressable on this platform.
    pub fn as_usize(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Frames-per-second used for both encoding and playback pacing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps(u32);

impl Fps {
    /// Create a validated frame rate.
    pub fn new(fps: u32) -> SketchResult<Self> {
        if fps == 0 {
            return Err(SketchError::validation("fps must be > 0"));
        }
        Ok(Self(fps))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        1.0 / f64::from(self.0)
    }

    /// Convert a frame index to seconds since frame 0.
    pub fn frames_to_secs(self, frame: FrameIndex) -> f64 {
        (frame.0 as f64) * self.frame_duration_secs()
    }
}

/// Sketch canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn validate(self) -> SketchResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SketchError::validation("canvas width/height must be non-zero"));
        }
        Ok(())
    }

    pub fn byte_len(self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }
}

/// A captured canvas surface: tightly packed RGBA8 rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Opaque surface filled with one color.
    pub fn filled(canvas: Canvas, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(canvas.byte_len());
        for _ in 0..(canvas.width as usize * canvas.height as usize) {
            data.extend_from_slice(&rgba);
        }
        Self {
            width: canvas.width,
            height: canvas.height,
            data,
            premultiplied: false,
        }
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_rejects_zero() {
        assert!(Fps::new(0).is_err());
        assert_eq!(Fps::new(30).unwrap().get(), 30);
    }

    #[test]
    fn fps_converts_frames_to_seconds() {
        let fps = Fps::new(30).unwrap();
        assert!((fps.frames_to_secs(FrameIndex(60)) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn filled_surface_has_expected_layout() {
        let canvas = Canvas {
            width: 3,
            height: 2,
        };
        let f = FrameRGBA::filled(canvas, [1, 2, 3, 255]);
        assert_eq!(f.data.len(), canvas.byte_len());
        assert_eq!(f.pixel(2, 1), Some([1, 2, 3, 255]));
        assert_eq!(f.pixel(3, 0), None);
    }

    #[test]
    fn canvas_validation() {
        assert!(
            Canvas {
                width: 0,
                height: 4
            }
            .validate()
            .is_err()
        );
    }
}
