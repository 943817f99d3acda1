use crate::{
    core::FrameIndex,
    error::SketchResult,
    session::{FrameLoop, SketchSession},
    sketch::{ANGLE_VAR, SpinningBar},
    storage::KeyValueStore,
};

/// How long the host loop runs and where it signals stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunPlan {
    /// Upper bound on frames run.
    pub frames: u64,
    /// Frame at which `end_export`/`record_stop` are called.
    pub stop_at: FrameIndex,
}

impl RunPlan {
    /// Stop on the last of `frames` frames.
    pub fn new(frames: u64) -> Self {
        Self {
            frames,
            stop_at: FrameIndex(frames.saturating_sub(1)),
        }
    }

    pub fn stop_at(mut self, frame: FrameIndex) -> Self {
        self.stop_at = frame;
        self
    }
}

/// Outcome of a demo run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunReport {
    /// Effective angle per frame, after recording/playback.
    pub angles: Vec<f64>,
    /// Frame at which the session asked the loop to stop.
    pub halted_at: Option<FrameIndex>,
}

/// Drive the spinning bar until the plan runs out or the session halts the loop.
///
/// Export and recording start at frame 0.
pub fn run_spinning_bar(
    sketch: &SpinningBar,
    session: &mut SketchSession,
    storage: &mut dyn KeyValueStore,
    plan: RunPlan,
) -> SketchResult<RunReport> {
    let mut report = RunReport::default();
    if plan.frames == 0 {
        return Ok(report);
    }

    session.start_export()?;
    session.record_start(FrameIndex(0));

    for frame in (0..plan.frames).map(FrameIndex) {
        let live = SpinningBar::angle_at(frame, session.fps());
        let angle = session.record_or_play_as(ANGLE_VAR, frame, live);
        report.angles.push(angle);

        let surface = sketch.draw(angle);
        session.capture_frame(frame, &surface)?;

        if frame == plan.stop_at {
            let export = session.end_export()?;
            let record = session.record_stop(storage)?;
            if export == FrameLoop::Halt || record == FrameLoop::Halt {
                report.halted_at = Some(frame);
                break;
            }
        }
    }

    tracing::info!(frames = report.angles.len(), "sketch run finished");
    Ok(report)
}
