#[cfg(feature = "camera")]
pub mod yolo;

use crate::segmentation::LandmarkSnapshot;

/// Locates the wrists in a frame. A frame without a visible body yields an
/// absent snapshot rather than an error.
pub trait PoseSource<F> {
    fn detect(&mut self, frame: &F) -> LandmarkSnapshot;
}

/// Blanket implementation so any closure with the right signature
/// automatically implements PoseSource.
impl<F, P> PoseSource<F> for P
where
    P: FnMut(&F) -> LandmarkSnapshot,
{
    fn detect(&mut self, frame: &F) -> LandmarkSnapshot {
        self(frame)
    }
}
