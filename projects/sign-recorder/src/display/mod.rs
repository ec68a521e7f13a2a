#[cfg(feature = "camera")]
pub mod overlay;

use crate::segmentation::{Command, LandmarkSnapshot, Point, SegmenterStatus};
use anyhow::Result;

/// COCO-17 bones as (start, end) keypoint indices
pub const SKELETON_CONNECTIONS: [(usize, usize); 16] = [
    // Face
    (3, 1),
    (1, 0),
    (0, 2),
    (2, 4),
    // Arms
    (5, 6),
    (5, 7),
    (7, 9),
    (6, 8),
    (8, 10),
    // Torso
    (5, 11),
    (6, 12),
    (11, 12),
    // Legs
    (11, 13),
    (13, 15),
    (12, 14),
    (14, 16),
];

/// Bones whose both ends were detected
pub fn skeleton_segments(landmarks: &LandmarkSnapshot) -> Vec<(Point, Point)> {
    SKELETON_CONNECTIONS
        .iter()
        .filter_map(|&(a, b)| Some((landmarks.keypoints[a]?, landmarks.keypoints[b]?)))
        .collect()
}

/// Everything the operator sees about the current frame
#[derive(Debug, Clone)]
pub struct StatusView {
    pub label: String,
    pub segmenter: SegmenterStatus,
    pub landmarks: LandmarkSnapshot,
    pub clips_saved: usize,
    pub last_error: Option<String>,
}

/// Operator feedback and key polling. Implementations draw on their own copy
/// of the frame; the frame passed in is the one being recorded.
pub trait StatusDisplay<F> {
    fn show(&mut self, frame: &F, status: &StatusView) -> Result<Option<Command>>;

    /// Shown right after a clip was saved, holding the frame briefly.
    fn confirm_clip(&mut self, frame: &F, status: &StatusView) -> Result<Option<Command>> {
        self.show(frame, status)
    }
}

/// Headless runs: nothing is drawn and no key is ever pressed.
pub struct NullDisplay;

impl<F> StatusDisplay<F> for NullDisplay {
    fn show(&mut self, _frame: &F, _status: &StatusView) -> Result<Option<Command>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::BODY_KEYPOINTS;

    #[test]
    fn test_skeleton_segments_skip_missing_joints() {
        let mut keypoints = [None; BODY_KEYPOINTS];
        // Left arm: shoulder 5, elbow 7, wrist 9
        keypoints[5] = Some(Point::new(0.4, 0.3));
        keypoints[7] = Some(Point::new(0.35, 0.45));
        keypoints[9] = Some(Point::new(0.3, 0.6));
        let snapshot = LandmarkSnapshot::absent().with_keypoints(keypoints);

        let segments = skeleton_segments(&snapshot);
        assert_eq!(
            segments,
            vec![
                (Point::new(0.4, 0.3), Point::new(0.35, 0.45)),
                (Point::new(0.35, 0.45), Point::new(0.3, 0.6)),
            ]
        );
    }

    #[test]
    fn test_skeleton_segments_empty_without_body() {
        assert!(skeleton_segments(&LandmarkSnapshot::absent()).is_empty());
    }

    #[test]
    fn test_skeleton_connections_in_range() {
        for &(a, b) in SKELETON_CONNECTIONS.iter() {
            assert!(a < BODY_KEYPOINTS && b < BODY_KEYPOINTS);
        }
    }
}
