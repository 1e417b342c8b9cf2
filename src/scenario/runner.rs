//! Drive one scenario into a sink.

#![expect(
    clippy::integer_division_remainder_used,
    reason = "tokio::select! macro usage"
)]

use bytes::BytesMut;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::{ScenarioPlan, ScenarioSpec, WriteShape};
use crate::{
    frame::EncodingError,
    metrics::WorkerProgress,
    stop::StopSignal,
    transport::FrameSink,
};

/// Attempted events between two progress log lines.
const PROGRESS_EVERY: u64 = 10_000;

/// How [`run_scenario`] finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerOutcome {
    /// Every planned event was attempted.
    Completed,
    /// The sink closed after an error; the rest were counted as errors.
    TransportFailed,
    /// The stop signal was raised before the plan finished.
    Stopped,
}

/// Execute `spec` against `sink`, recording counts in `progress`.
///
/// Events are encoded into a reused buffer and written in plan order. A send
/// error counts every event of that write as an error. If the sink reports
/// itself closed afterwards, the remaining planned events are counted as
/// attempted and errored without touching the wire. The stop signal is
/// checked between writes only; a send that fails once it is raised ends the
/// run as [`RunnerOutcome::Stopped`]. The sink is closed before returning.
///
/// # Errors
/// Returns [`EncodingError`] if an event cannot be encoded; the worker is
/// expected to abort and escalate.
pub async fn run_scenario<S>(
    sink: &mut S,
    spec: &ScenarioSpec,
    progress: &WorkerProgress,
    mut stop: StopSignal,
) -> Result<RunnerOutcome, EncodingError>
where
    S: FrameSink + ?Sized,
{
    progress.start();
    let mut plan = ScenarioPlan::new(spec);
    let mut buf = BytesMut::new();
    let mut next_report = PROGRESS_EVERY;
    let mut outcome = RunnerOutcome::Completed;

    while !stop.is_raised() {
        let Some(step) = plan.next() else {
            break;
        };
        buf.clear();
        for event in &step.events {
            if let Err(err) = event.encode_into(&mut buf) {
                warn!(scenario = %spec.name, event_id = %event.id, error = %err, "encoding failed");
                sink.close().await;
                return Err(err);
            }
        }

        let frames = step.events.len() as u64;
        progress.add_attempted(frames);
        let result = match step.shape {
            WriteShape::PerFrame | WriteShape::Sticky => sink.send(&buf).await,
            WriteShape::Split { cut } => sink.send_split(&buf, cut).await,
        };
        match result {
            Ok(()) => progress.add_sent(frames),
            Err(err) => {
                progress.add_errors(frames);
                if stop.is_raised() {
                    debug!(scenario = %spec.name, error = %err, "send failed while stopping");
                    break;
                }
                if !sink.is_open() {
                    let remaining = plan.remaining();
                    warn!(
                        scenario = %spec.name,
                        error = %err,
                        remaining,
                        "session lost; counting remaining events as errors"
                    );
                    progress.add_attempted(remaining);
                    progress.add_errors(remaining);
                    outcome = RunnerOutcome::TransportFailed;
                    break;
                }
                debug!(scenario = %spec.name, error = %err, "send failed");
            }
        }

        if progress.attempted() >= next_report {
            let snap = progress.snapshot();
            debug!(
                scenario = %spec.name,
                attempted = snap.attempted,
                sent = snap.sent,
                errors = snap.errors,
                "progress"
            );
            next_report = next_report.saturating_add(PROGRESS_EVERY);
        }

        if !spec.pace.is_zero() {
            tokio::select! {
                () = sleep(spec.pace) => {}
                () = stop.raised() => {}
            }
        }
    }

    if outcome == RunnerOutcome::Completed && plan.remaining() > 0 {
        outcome = RunnerOutcome::Stopped;
    }
    sink.close().await;
    Ok(outcome)
}
