//! The sequential per-frame loop.
//!
//! One frame in, at most one alert out; frame N+1 is not read until frame N
//! has been decided. The only cancellation point is the run-control check at
//! the top of each cycle.

use crate::interfaces::{FaceRecognizer, FrameSource, RunControl, SourceError};
use crate::orchestrator::Orchestrator;
use crate::session::DetectionSession;
use chrono::{Local, NaiveDateTime};
use std::time::Duration;

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Run control reported inactive.
    Stopped,
    /// The frame source ran out of frames.
    EndOfStream,
}

pub struct RunOptions {
    /// Pause after each cycle.
    pub frame_interval: Duration,
    /// Wall-clock source used for dwell timing and time-of-day decisions.
    pub clock: fn() -> NaiveDateTime,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(100),
            clock: local_now,
        }
    }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Drive `orchestrator` with frames from `source` until stopped or the
/// source is exhausted.
///
/// Recognizer failures skip the frame. Frame source errors other than
/// end-of-stream are returned. `on_cycle` runs after every processed frame.
pub fn run<S, R, C>(
    source: &mut S,
    orchestrator: &mut Orchestrator<R>,
    session: &mut DetectionSession,
    control: &C,
    options: &RunOptions,
    mut on_cycle: impl FnMut(&DetectionSession),
) -> Result<RunOutcome, SourceError>
where
    S: FrameSource + ?Sized,
    R: FaceRecognizer,
    C: RunControl + ?Sized,
{
    loop {
        if !control.is_active() {
            tracing::info!(frames = session.frames_processed(), "run control inactive; stopping");
            return Ok(RunOutcome::Stopped);
        }

        let frame = match source.read() {
            Ok(frame) => frame,
            Err(SourceError::EndOfStream) => {
                tracing::info!(frames = session.frames_processed(), "frame source exhausted");
                return Ok(RunOutcome::EndOfStream);
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = orchestrator.process_frame(session, &frame, (options.clock)()) {
            tracing::warn!(error = %e, frame = frame.sequence, "frame skipped");
        }
        on_cycle(session);

        if !options.frame_interval.is_zero() {
            std::thread::sleep(options.frame_interval);
        }
    }
}
