use super::{Acquired, FrameSource};
use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT},
};
use std::time::Duration;

/// Replays a prerecorded video. Run time is derived from the frame index,
/// so segmentation of a file is deterministic.
pub struct OpencvFileSource {
    capture: VideoCapture,
    source_fps: f64,
    next_index: u64,
    pb: ProgressBar,
}

impl OpencvFileSource {
    pub fn open(path: &str) -> Result<Self> {
        let capture = VideoCapture::from_file(path, CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(anyhow!("Failed to open video file: {}", path));
        }

        let mut fps = capture.get(CAP_PROP_FPS)?;
        if fps <= 0.0 {
            tracing::warn!("OpencvFileSource: Failed to get FPS from metadata, falling back to 30.0");
            fps = 30.0;
        }
        let raw_count = capture.get(CAP_PROP_FRAME_COUNT)?.max(0.0) as u64;

        tracing::info!(
            "OpencvFileSource: opened {}, duration={:.2}s, fps={:.2}, stream_frames={}",
            path,
            raw_count as f64 / fps,
            fps,
            raw_count
        );

        let pb = ProgressBar::new(raw_count);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec:.1.yellow} fps, {eta})")?
                .progress_chars("#>-"),
        );

        Ok(Self {
            capture,
            source_fps: fps,
            next_index: 0,
            pb,
        })
    }
}

impl FrameSource<Mat> for OpencvFileSource {
    fn next_frame(&mut self) -> Result<Acquired<Mat>> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            self.pb.finish_with_message("Done");
            return Ok(Acquired::Exhausted);
        }

        let elapsed = Duration::from_secs_f64(self.next_index as f64 / self.source_fps);
        self.next_index += 1;
        self.pb.inc(1);

        Ok(Acquired::Frame(frame, elapsed))
    }
}
