#[cfg(feature = "camera")]
pub mod camera;
#[cfg(feature = "camera")]
pub mod file_source;
#[cfg(feature = "camera")]
pub mod writer;

use anyhow::Result;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: i32,
    pub height: i32,
}

/// An image as it came off the source. Cloning must produce an independent copy.
pub trait Frame: Clone {
    fn dimensions(&self) -> FrameSize;
}

/// Result of one acquisition attempt
pub enum Acquired<F> {
    /// A frame and the run time at which it was taken
    Frame(F, Duration),
    /// Nothing this iteration; try again on the next one
    Missed,
    /// The source has no more frames
    Exhausted,
}

pub trait FrameSource<F> {
    fn next_frame(&mut self) -> Result<Acquired<F>>;
}

/// Encodes ordered frames into one stored clip per handle.
/// `close` takes the handle by value, so a handle is closed at most once.
pub trait ClipWriter<F> {
    type Handle;

    fn open(&mut self, path: &Path, frame_size: FrameSize, frame_rate: f64)
        -> Result<Self::Handle>;
    fn write(&mut self, handle: &mut Self::Handle, frame: &F) -> Result<()>;
    fn close(&mut self, handle: Self::Handle) -> Result<()>;
}
