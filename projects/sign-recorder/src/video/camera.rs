use super::{Acquired, Frame, FrameSize, FrameSource};
use anyhow::{anyhow, Result};
use opencv::{
    core::{flip, Mat},
    prelude::*,
    videoio::{VideoCapture, CAP_ANY, CAP_PROP_BUFFERSIZE, CAP_PROP_FPS},
};
use std::time::Instant;

impl Frame for Mat {
    fn dimensions(&self) -> FrameSize {
        FrameSize {
            width: self.cols(),
            height: self.rows(),
        }
    }
}

/// Live capture device. Frames are mirrored by default so the preview
/// behaves like a mirror for the person signing.
pub struct OpencvCamera {
    capture: VideoCapture,
    mirror: bool,
    started: Instant,
}

impl OpencvCamera {
    pub fn open(index: i32, mirror: bool) -> Result<Self> {
        let mut capture = VideoCapture::new(index, CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(anyhow!("Failed to open camera {}", index));
        }

        // Keep latency low: only the newest frame matters
        if let Ok(false) | Err(_) = capture.set(CAP_PROP_BUFFERSIZE, 1.0) {
            tracing::debug!("Camera {} ignored the buffer size hint", index);
        }

        let fps = capture.get(CAP_PROP_FPS).unwrap_or(0.0);
        tracing::info!(
            "OpencvCamera: opened device {}, reported fps={:.1}, mirror={}",
            index,
            fps,
            mirror
        );

        Ok(Self {
            capture,
            mirror,
            started: Instant::now(),
        })
    }
}

impl FrameSource<Mat> for OpencvCamera {
    fn next_frame(&mut self) -> Result<Acquired<Mat>> {
        let mut frame = Mat::default();
        match self.capture.read(&mut frame) {
            Ok(true) if !frame.empty() => {}
            Ok(_) => return Ok(Acquired::Missed),
            Err(e) => {
                tracing::debug!("Camera read error: {}", e);
                return Ok(Acquired::Missed);
            }
        }
        let elapsed = self.started.elapsed();

        if self.mirror {
            let mut mirrored = Mat::default();
            flip(&frame, &mut mirrored, 1)?;
            frame = mirrored;
        }

        Ok(Acquired::Frame(frame, elapsed))
    }
}
