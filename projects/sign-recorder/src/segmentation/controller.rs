// Automatic segmentation controller
//
// Watches the wrist displacement from a calibrated neutral pose and decides
// when a clip starts, pauses, resumes and ends.

use crate::dataset::allocator::ClipAllocator;
use crate::segmentation::config::{MissingLandmarkPolicy, SegmentationConfig};
use crate::segmentation::geometry::{displacement, wrist_midpoint};
use crate::segmentation::session::ClipSession;
use crate::segmentation::types::{
    FinishedClip, LandmarkSnapshot, Point, RecorderState, SegmenterStatus, StepOutcome,
};
use crate::segmentation::{FrameInput, Segmenter};
use std::time::Duration;

/// The neutral point only exists outside calibration, and a session only
/// exists while recording or ending.
enum Phase<F> {
    Calibrating {
        window_start: Option<Duration>,
    },
    Idle {
        neutral: Point,
    },
    Recording {
        neutral: Point,
        session: ClipSession<F>,
    },
    Ending {
        neutral: Point,
        session: ClipSession<F>,
        still_since: Duration,
    },
}

impl<F> Default for Phase<F> {
    fn default() -> Self {
        Phase::Calibrating { window_start: None }
    }
}

impl<F> Phase<F> {
    fn state(&self) -> RecorderState {
        match self {
            Phase::Calibrating { .. } => RecorderState::Calibrating,
            Phase::Idle { .. } => RecorderState::Idle,
            Phase::Recording { .. } => RecorderState::Recording,
            Phase::Ending { .. } => RecorderState::Ending,
        }
    }
}

/// Displacement reading for one frame after the missing-landmark policy
enum Reading {
    Value(f32),
    Skip,
}

pub struct SegmentationController<F> {
    config: SegmentationConfig,
    allocator: ClipAllocator,
    phase: Phase<F>,
    last_valid: Option<f32>,
    current: Option<f32>,
    last_elapsed: Duration,
}

impl<F: Clone> SegmentationController<F> {
    pub fn new(config: SegmentationConfig, allocator: ClipAllocator) -> Self {
        Self {
            config,
            allocator,
            phase: Phase::default(),
            last_valid: None,
            current: None,
            last_elapsed: Duration::ZERO,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.phase.state()
    }

    pub fn neutral(&self) -> Option<Point> {
        match &self.phase {
            Phase::Calibrating { .. } => None,
            Phase::Idle { neutral }
            | Phase::Recording { neutral, .. }
            | Phase::Ending { neutral, .. } => Some(*neutral),
        }
    }

    /// Frames buffered in the active clip, if any
    pub fn clip_frames(&self) -> Option<usize> {
        match &self.phase {
            Phase::Recording { session, .. } | Phase::Ending { session, .. } => {
                Some(session.frame_count())
            }
            _ => None,
        }
    }

    /// Advance the state machine by one frame.
    pub fn step(
        &mut self,
        frame: &F,
        snapshot: &LandmarkSnapshot,
        elapsed: Duration,
    ) -> StepOutcome {
        self.last_elapsed = elapsed;
        let (phase, outcome) = match std::mem::take(&mut self.phase) {
            Phase::Calibrating { window_start } => {
                self.current = None;
                self.calibrate(window_start, snapshot, elapsed)
            }
            Phase::Idle { neutral } => self.idle(neutral, snapshot, elapsed),
            Phase::Recording {
                neutral,
                mut session,
            } => match self.read(snapshot, neutral) {
                Reading::Skip => (Phase::Recording { neutral, session }, StepOutcome::default()),
                Reading::Value(d) => {
                    session.push(frame.clone());
                    if d < self.config.movement_threshold {
                        let mut outcome =
                            StepOutcome::moved(RecorderState::Recording, RecorderState::Ending);
                        outcome.record_frame = true;
                        (
                            Phase::Ending {
                                neutral,
                                session,
                                still_since: elapsed,
                            },
                            outcome,
                        )
                    } else {
                        let outcome = StepOutcome {
                            record_frame: true,
                            ..StepOutcome::default()
                        };
                        (Phase::Recording { neutral, session }, outcome)
                    }
                }
            },
            Phase::Ending {
                neutral,
                mut session,
                still_since,
            } => match self.read(snapshot, neutral) {
                Reading::Skip => (
                    Phase::Ending {
                        neutral,
                        session,
                        still_since,
                    },
                    StepOutcome::default(),
                ),
                Reading::Value(d) => {
                    session.push(frame.clone());
                    if d > self.config.movement_threshold {
                        tracing::debug!("Movement resumed, continuing clip");
                        let mut outcome =
                            StepOutcome::moved(RecorderState::Ending, RecorderState::Recording);
                        outcome.record_frame = true;
                        (Phase::Recording { neutral, session }, outcome)
                    } else if elapsed.saturating_sub(still_since) >= self.config.cooldown {
                        let finished = session.finish(elapsed);
                        tracing::info!(
                            "Stillness held for {:.2}s, closing {} ({} frames)",
                            elapsed.saturating_sub(still_since).as_secs_f32(),
                            finished.ticket.file_name,
                            finished.frame_count
                        );
                        let mut outcome =
                            StepOutcome::moved(RecorderState::Ending, RecorderState::Idle);
                        outcome.record_frame = true;
                        outcome.finished = Some(finished);
                        (Phase::Idle { neutral }, outcome)
                    } else {
                        let outcome = StepOutcome {
                            record_frame: true,
                            ..StepOutcome::default()
                        };
                        (
                            Phase::Ending {
                                neutral,
                                session,
                                still_since,
                            },
                            outcome,
                        )
                    }
                }
            },
        };
        self.phase = phase;
        outcome
    }

    /// Close the active clip immediately and return to IDLE.
    /// Returns `None` when nothing was being recorded.
    pub fn force_finalize(&mut self, elapsed: Duration) -> Option<FinishedClip> {
        match std::mem::take(&mut self.phase) {
            Phase::Recording { neutral, session } | Phase::Ending { neutral, session, .. } => {
                self.phase = Phase::Idle { neutral };
                Some(session.finish(elapsed))
            }
            other => {
                self.phase = other;
                None
            }
        }
    }

    pub fn status(&self) -> SegmenterStatus {
        let calibration_remaining = match &self.phase {
            Phase::Calibrating { window_start } => {
                let started = window_start.unwrap_or(self.last_elapsed);
                let waited = self.last_elapsed.saturating_sub(started);
                Some(self.config.calibration_window.saturating_sub(waited))
            }
            _ => None,
        };

        SegmenterStatus {
            state: self.state(),
            neutral: self.neutral(),
            displacement: self.current,
            threshold: Some(self.config.movement_threshold),
            calibration_remaining,
            clip_frames: self.clip_frames(),
        }
    }

    fn calibrate(
        &mut self,
        window_start: Option<Duration>,
        snapshot: &LandmarkSnapshot,
        elapsed: Duration,
    ) -> (Phase<F>, StepOutcome) {
        let started = window_start.unwrap_or(elapsed);
        if elapsed.saturating_sub(started) < self.config.calibration_window {
            return (
                Phase::Calibrating {
                    window_start: Some(started),
                },
                StepOutcome::default(),
            );
        }

        match wrist_midpoint(snapshot) {
            Some(neutral) => {
                tracing::info!(
                    "Neutral position calibrated at ({:.3}, {:.3})",
                    neutral.x,
                    neutral.y
                );
                self.current = Some(0.0);
                self.last_valid = Some(0.0);
                let mut outcome =
                    StepOutcome::moved(RecorderState::Calibrating, RecorderState::Idle);
                outcome.calibrated = Some(neutral);
                (Phase::Idle { neutral }, outcome)
            }
            None => {
                tracing::warn!("No landmarks at the end of calibration, restarting the window");
                (
                    Phase::Calibrating {
                        window_start: Some(elapsed),
                    },
                    StepOutcome::default(),
                )
            }
        }
    }

    fn idle(
        &mut self,
        neutral: Point,
        snapshot: &LandmarkSnapshot,
        elapsed: Duration,
    ) -> (Phase<F>, StepOutcome) {
        match self.read(snapshot, neutral) {
            Reading::Value(d) if d > self.config.movement_threshold => {
                let ticket = self.allocator.allocate();
                tracing::info!(
                    "Movement detected ({:.3} > {:.3}), recording {}",
                    d,
                    self.config.movement_threshold,
                    ticket.file_name
                );
                let session = ClipSession::new(ticket.clone(), elapsed);
                let mut outcome = StepOutcome::moved(RecorderState::Idle, RecorderState::Recording);
                outcome.opened = Some(ticket);
                (Phase::Recording { neutral, session }, outcome)
            }
            _ => (Phase::Idle { neutral }, StepOutcome::default()),
        }
    }

    fn read(&mut self, snapshot: &LandmarkSnapshot, neutral: Point) -> Reading {
        let reading = match displacement(snapshot, neutral) {
            Some(d) => {
                self.last_valid = Some(d);
                Reading::Value(d)
            }
            None => match self.config.missing_landmarks {
                MissingLandmarkPolicy::Zero => Reading::Value(0.0),
                MissingLandmarkPolicy::Hold => Reading::Value(self.last_valid.unwrap_or(0.0)),
                MissingLandmarkPolicy::Pause => Reading::Skip,
            },
        };
        self.current = match reading {
            Reading::Value(d) => Some(d),
            Reading::Skip => None,
        };
        reading
    }
}

impl<F: Clone> Segmenter<F> for SegmentationController<F> {
    fn step(&mut self, input: FrameInput<'_, F>) -> StepOutcome {
        SegmentationController::step(self, input.frame, input.landmarks, input.elapsed)
    }

    fn force_finalize(&mut self, elapsed: Duration) -> Option<FinishedClip> {
        SegmentationController::force_finalize(self, elapsed)
    }

    fn status(&self) -> SegmenterStatus {
        SegmentationController::status(self)
    }
}
