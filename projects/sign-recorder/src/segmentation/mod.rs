// Gesture segmentation: decides which frames belong to which clip

pub mod config;
pub mod controller;
pub mod geometry;
pub mod manual;
pub mod session;
pub mod types;

pub use config::{MissingLandmarkPolicy, SegmentationConfig};
pub use controller::SegmentationController;
pub use manual::ManualController;
pub use types::{
    ClipTicket, Command, FinishedClip, LandmarkSnapshot, Point, RecorderState, SegmenterStatus,
    StepOutcome, Transition, WristPair, BODY_KEYPOINTS,
};

use std::time::Duration;

/// Everything a segmenter sees for one frame
#[derive(Debug)]
pub struct FrameInput<'a, F> {
    pub frame: &'a F,
    pub landmarks: &'a LandmarkSnapshot,
    pub command: Option<Command>,
    /// Run time at which the frame was acquired
    pub elapsed: Duration,
}

/// Common surface of the automatic and manual segmenters.
pub trait Segmenter<F> {
    fn step(&mut self, input: FrameInput<'_, F>) -> StepOutcome;

    /// Close any open clip right away and return to IDLE.
    fn force_finalize(&mut self, elapsed: Duration) -> Option<FinishedClip>;

    fn status(&self) -> SegmenterStatus;
}
