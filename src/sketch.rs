//! Demo sketch: a white bar spinning half a turn per second on a black canvas.

use std::f64::consts::TAU;

use kurbo::{Affine, Point, Rect, Vec2};

use crate::core::{Canvas, Fps, FrameIndex, FrameRGBA};

const SUBSAMPLES: [(f64, f64); 4] = [(0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)];

/// Name under which the demo tracks its rotation.
pub const ANGLE_VAR: &str = "angle";

#[derive(Clone, Copy, Debug)]
pub struct SpinningBar {
    pub canvas: Canvas,
    pub background: [u8; 4],
    pub fill: [u8; 4],
}

impl SpinningBar {
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            background: [0, 0, 0, 255],
            fill: [255, 255, 255, 255],
        }
    }

    /// Live rotation (radians) for `frame`.
    pub fn angle_at(frame: FrameIndex, fps: Fps) -> f64 {
        fps.frames_to_secs(frame) * TAU * 0.5
    }

    /// Bar rectangle in bar-local space, centered on the origin.
    pub fn bar_rect(&self) -> Rect {
        let w = f64::from(self.canvas.width);
        let h = f64::from(self.canvas.height);
        Rect::from_center_size(Point::ORIGIN, (w * 0.75, h * 0.075))
    }

    pub fn draw(&self, angle: f64) -> FrameRGBA {
        let mut out = FrameRGBA::filled(self.canvas, self.background);
        let center = Vec2::new(
            f64::from(self.canvas.width) * 0.5,
            f64::from(self.canvas.height) * 0.5,
        );
        let to_local = (Affine::translate(center) * Affine::rotate(angle)).inverse();
        let bar = self.bar_rect();

        let width = self.canvas.width as usize;
        for (i, px) in out.data.chunks_exact_mut(4).enumerate() {
            let x = (i % width) as f64;
            let y = (i / width) as f64;
            let hits = SUBSAMPLES
                .iter()
                .filter(|(dx, dy)| bar.contains(to_local * Point::new(x + dx, y + dy)))
                .count() as u16;
            if hits == 0 {
                continue;
            }
            let n = SUBSAMPLES.len() as u16;
            for c in 0..3 {
                let bg = u16::from(self.background[c]);
                let fg = u16::from(self.fill[c]);
                px[c] = ((fg * hits + bg * (n - hits) + n / 2) / n) as u8;
            }
        }
        out
    }
}
