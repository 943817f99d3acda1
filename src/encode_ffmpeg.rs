use std::{
    io::Write as _,
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use crate::{
    capture::FrameCapturer,
    core::{Fps, FrameRGBA},
    error::{SketchError, SketchResult},
    options::CaptureFormat,
};

#[derive(Clone, Debug)]
pub struct VideoConfig {
    pub format: CaptureFormat,
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    pub out_path: PathBuf,
    pub overwrite: bool,
    pub verbose: bool,
}

impl VideoConfig {
    pub fn validate(&self) -> SketchResult<()> {
        if self.format == CaptureFormat::Png {
            return Err(SketchError::validation(
                "png output is an image sequence, not an ffmpeg video",
            ));
        }
        if self.width == 0 || self.height == 0 {
            return Err(SketchError::validation(
                "video width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // Both codecs below target yuv420p.
            return Err(SketchError::validation(
                "video width/height must be even (required for yuv420p output)",
            ));
        }
        Ok(())
    }

    fn codec_args(&self) -> &'static [&'static str] {
        match self.format {
            CaptureFormat::Mp4 => &[
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
            ],
            _ => &[
                "-c:v",
                "libvpx-vp9",
                "-pix_fmt",
                "yuv420p",
                "-b:v",
                "0",
                "-crf",
                "32",
            ],
        }
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> SketchResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

struct Running {
    child: Child,
    stdin: Option<ChildStdin>,
}

/// Pipes raw RGBA frames into a system `ffmpeg` process.
pub struct FfmpegCapturer {
    cfg: VideoConfig,
    bg_rgba: [u8; 4],
    running: Option<Running>,
    scratch: Vec<u8>,
    frames: u64,
}

impl FfmpegCapturer {
    /// Nothing is spawned until [`FrameCapturer::start`].
    pub fn new(cfg: VideoConfig, bg_rgba: [u8; 4]) -> Self {
        Self {
            scratch: vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4],
            cfg,
            bg_rgba,
            running: None,
            frames: 0,
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    fn spawn(&self) -> SketchResult<Running> {
        let cfg = &self.cfg;
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !cfg.overwrite && cfg.out_path.exists() {
            return Err(SketchError::validation(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(SketchError::capture(format!(
                "ffmpeg is required for {} export, but was not found on PATH",
                cfg.format.extension()
            )));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        cmd.arg(if cfg.overwrite { "-y" } else { "-n" });
        cmd.args([
            "-loglevel",
            if cfg.verbose { "warning" } else { "error" },
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.get().to_string(),
            "-i",
            "pipe:0",
            "-an",
        ])
        .args(cfg.codec_args())
        .arg(&cfg.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            SketchError::capture(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SketchError::capture("failed to open ffmpeg stdin (unexpected)"))?;

        Ok(Running {
            child,
            stdin: Some(stdin),
        })
    }
}

impl FrameCapturer for FfmpegCapturer {
    fn start(&mut self) -> SketchResult<()> {
        if self.running.is_some() {
            return Err(SketchError::capture("ffmpeg capturer already started"));
        }
        self.running = Some(self.spawn()?);
        self.frames = 0;
        tracing::debug!(out = %self.cfg.out_path.display(), "ffmpeg capture started");
        Ok(())
    }

    fn capture(&mut self, frame: &FrameRGBA) -> SketchResult<()> {
        if frame.width != self.cfg.width || frame.height != self.cfg.height {
            return Err(SketchError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.cfg.width, self.cfg.height
            )));
        }

        flatten_to_opaque_rgba8(
            &mut self.scratch,
            &frame.data,
            frame.premultiplied,
            self.bg_rgba,
        )?;

        let Some(stdin) = self.running.as_mut().and_then(|r| r.stdin.as_mut()) else {
            return Err(SketchError::capture(
                "ffmpeg capturer is not running (start not called, or already saved)",
            ));
        };

        stdin.write_all(&self.scratch).map_err(|e| {
            SketchError::capture(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        self.frames += 1;
        if self.cfg.verbose {
            tracing::trace!(frame = self.frames, "frame piped to ffmpeg");
        }
        Ok(())
    }

    fn save(&mut self) -> SketchResult<()> {
        let Some(mut running) = self.running.take() else {
            return Err(SketchError::capture("ffmpeg capturer is not running"));
        };
        drop(running.stdin.take());

        let output = running.child.wait_with_output().map_err(|e| {
            SketchError::capture(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SketchError::capture(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        tracing::debug!(
            frames = self.frames,
            out = %self.cfg.out_path.display(),
            "ffmpeg capture saved"
        );
        Ok(())
    }

    fn stop(&mut self) -> SketchResult<()> {
        // Only reached with a live child when `save` was skipped.
        if let Some(mut running) = self.running.take() {
            drop(running.stdin.take());
            let _ = running.child.kill();
            let _ = running.child.wait();
            tracing::warn!("ffmpeg capture stopped before save; output discarded");
        }
        Ok(())
    }
}

impl Drop for FfmpegCapturer {
    fn drop(&mut self) {
        if let Some(mut running) = self.running.take() {
            let _ = running.child.kill();
            let _ = running.child.wait();
        }
    }
}

fn flatten_to_opaque_rgba8(
    dst: &mut [u8],
    src: &[u8],
    src_is_premul: bool,
    bg_rgba: [u8; 4],
) -> SketchResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(SketchError::validation(
            "frame data length does not match width*height*4",
        ));
    }

    let bg = [
        u16::from(bg_rgba[0]),
        u16::from(bg_rgba[1]),
        u16::from(bg_rgba[2]),
    ];

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255 - a;
        for c in 0..3 {
            let fg = if src_is_premul {
                u16::from(s[c])
            } else {
                mul_div255(u16::from(s[c]), a)
            };
            d[c] = (fg + mul_div255(bg[c], inv)).min(255) as u8;
        }
        d[3] = 255;
    }

    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}
