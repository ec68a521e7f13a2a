use super::{ClipWriter, FrameSize};
use anyhow::{anyhow, Context, Result};
use opencv::{
    core::{Mat, Size},
    prelude::*,
    videoio::VideoWriter,
};
use std::path::Path;

/// Writes clips through OpenCV's `VideoWriter`.
pub struct OpencvClipWriter {
    fourcc: i32,
}

impl OpencvClipWriter {
    /// MPEG-4 Part 2, readable by the training tooling as `.mp4`
    pub fn mp4v() -> Result<Self> {
        Ok(Self {
            fourcc: VideoWriter::fourcc('m', 'p', '4', 'v')?,
        })
    }
}

impl ClipWriter<Mat> for OpencvClipWriter {
    type Handle = VideoWriter;

    fn open(&mut self, path: &Path, frame_size: FrameSize, frame_rate: f64) -> Result<VideoWriter> {
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("Clip path is not valid UTF-8: {:?}", path))?;
        let size = Size::new(frame_size.width, frame_size.height);

        let writer = VideoWriter::new(path_str, self.fourcc, frame_rate, size, true)
            .with_context(|| format!("Failed to create video writer for {}", path_str))?;
        if !writer.is_opened()? {
            return Err(anyhow!("Video writer did not open {}", path_str));
        }

        tracing::debug!(
            "Opened clip {} ({}x{} @ {:.1} fps)",
            path_str,
            frame_size.width,
            frame_size.height,
            frame_rate
        );
        Ok(writer)
    }

    fn write(&mut self, handle: &mut VideoWriter, frame: &Mat) -> Result<()> {
        handle.write(frame)?;
        Ok(())
    }

    fn close(&mut self, mut handle: VideoWriter) -> Result<()> {
        handle.release()?;
        Ok(())
    }
}
