use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// A 2D point in normalized image coordinates [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Left and right wrist as located by the pose source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WristPair {
    pub left: Point,
    pub right: Point,
}

/// COCO-17 body keypoints
pub const BODY_KEYPOINTS: usize = 17;

/// Per-frame output of a pose source. `wrists` is `None` when no body was found.
/// Segmentation only looks at the wrists; `keypoints` is kept for the overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LandmarkSnapshot {
    pub wrists: Option<WristPair>,
    pub keypoints: [Option<Point>; BODY_KEYPOINTS],
}

impl LandmarkSnapshot {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn from_wrists(left: Point, right: Point) -> Self {
        Self {
            wrists: Some(WristPair { left, right }),
            ..Self::default()
        }
    }

    pub fn with_keypoints(mut self, keypoints: [Option<Point>; BODY_KEYPOINTS]) -> Self {
        self.keypoints = keypoints;
        self
    }

    pub fn is_present(&self) -> bool {
        self.wrists.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecorderState {
    Calibrating,
    Idle,
    Recording,
    Ending,
}

impl RecorderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecorderState::Calibrating => "CALIBRATING",
            RecorderState::Idle => "IDLE",
            RecorderState::Recording => "RECORDING",
            RecorderState::Ending => "ENDING",
        }
    }

    pub fn has_session(&self) -> bool {
        matches!(self, RecorderState::Recording | RecorderState::Ending)
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator input polled once per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    StartRecording,
}

/// Identity of a clip inside the label directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipTicket {
    pub file_name: String,
    pub path: PathBuf,
}

/// A closed clip session. The buffered frames are gone by the time this exists.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedClip {
    pub ticket: ClipTicket,
    pub started_at: Duration,
    pub ended_at: Duration,
    pub frame_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: RecorderState,
    pub to: RecorderState,
}

/// What a single controller step asks the recorder to do, in order:
/// open `opened`, write the current frame if `record_frame`, then close `finished`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutcome {
    pub transition: Option<Transition>,
    pub calibrated: Option<Point>,
    pub opened: Option<ClipTicket>,
    pub record_frame: bool,
    pub finished: Option<FinishedClip>,
}

impl StepOutcome {
    pub(crate) fn moved(from: RecorderState, to: RecorderState) -> Self {
        Self {
            transition: Some(Transition { from, to }),
            ..Self::default()
        }
    }
}

/// Display-facing view of a segmenter
#[derive(Debug, Clone, PartialEq)]
pub struct SegmenterStatus {
    pub state: RecorderState,
    pub neutral: Option<Point>,
    pub displacement: Option<f32>,
    pub threshold: Option<f32>,
    pub calibration_remaining: Option<Duration>,
    pub clip_frames: Option<usize>,
}
