use crate::dataset::allocator::ClipAllocator;
use crate::segmentation::session::ClipSession;
use crate::segmentation::types::{
    Command, FinishedClip, RecorderState, SegmenterStatus, StepOutcome, Transition,
};
use crate::segmentation::{FrameInput, Segmenter};
use std::time::Duration;

pub const DEFAULT_CLIP_FRAMES: usize = 30;

/// Operator-triggered recording: a start command opens a clip that closes
/// itself after a fixed number of frames. No calibration, no landmarks needed.
pub struct ManualController<F> {
    clip_frames: usize,
    allocator: ClipAllocator,
    session: Option<ClipSession<F>>,
}

impl<F: Clone> ManualController<F> {
    pub fn new(clip_frames: usize, allocator: ClipAllocator) -> Self {
        Self {
            clip_frames: clip_frames.max(1),
            allocator,
            session: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        if self.session.is_some() {
            RecorderState::Recording
        } else {
            RecorderState::Idle
        }
    }
}

impl<F: Clone> Segmenter<F> for ManualController<F> {
    fn step(&mut self, input: FrameInput<'_, F>) -> StepOutcome {
        let mut outcome = StepOutcome::default();

        if self.session.is_none() && input.command == Some(Command::StartRecording) {
            let ticket = self.allocator.allocate();
            tracing::info!("Manual recording started: {}", ticket.file_name);
            self.session = Some(ClipSession::new(ticket.clone(), input.elapsed));
            outcome = StepOutcome::moved(RecorderState::Idle, RecorderState::Recording);
            outcome.opened = Some(ticket);
        }

        let Some(session) = self.session.as_mut() else {
            return outcome;
        };

        session.push(input.frame.clone());
        outcome.record_frame = true;

        if session.frame_count() >= self.clip_frames {
            if let Some(session) = self.session.take() {
                let finished = session.finish(input.elapsed);
                tracing::info!(
                    "Manual recording finished: {} ({} frames)",
                    finished.ticket.file_name,
                    finished.frame_count
                );
                // A one-frame clip opens and closes in the same step
                let from = outcome
                    .transition
                    .map(|t| t.from)
                    .unwrap_or(RecorderState::Recording);
                outcome.transition = Some(Transition {
                    from,
                    to: RecorderState::Idle,
                });
                outcome.finished = Some(finished);
            }
        }

        outcome
    }

    fn force_finalize(&mut self, elapsed: Duration) -> Option<FinishedClip> {
        self.session.take().map(|s| s.finish(elapsed))
    }

    fn status(&self) -> SegmenterStatus {
        SegmenterStatus {
            state: self.state(),
            neutral: None,
            displacement: None,
            threshold: None,
            calibration_remaining: None,
            clip_frames: self.session.as_ref().map(ClipSession::frame_count),
        }
    }
}
