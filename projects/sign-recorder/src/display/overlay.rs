use super::{skeleton_segments, StatusDisplay, StatusView};
use crate::segmentation::{Command, Point as NormPoint, RecorderState};
use anyhow::Result;
use opencv::core::{Mat, Point, Rect, Scalar};
use opencv::highgui::{self, WINDOW_NORMAL};
use opencv::imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8};
use opencv::prelude::*;

const KEY_ESC: i32 = 27;

/// Bar scale: one normalized unit of displacement is this many pixels
const BAR_SCALE: f32 = 500.0;

/// OpenCV window showing the camera with the recorder state drawn on top.
pub struct OverlayWindow {
    title: String,
    confirm_pause_ms: i32,
}

impl OverlayWindow {
    pub fn new(title: &str, confirm_pause_ms: u64) -> Result<Self> {
        highgui::named_window(title, WINDOW_NORMAL)?;
        Ok(Self {
            title: title.to_string(),
            confirm_pause_ms: confirm_pause_ms.clamp(1, i32::MAX as u64) as i32,
        })
    }

    fn render(&self, frame: &Mat, status: &StatusView) -> Result<Mat> {
        // Draw on a copy; the caller's frame is what gets recorded
        let mut canvas = frame.clone();
        let width = canvas.cols();
        let height = canvas.rows();
        let seg = &status.segmenter;

        match seg.state {
            RecorderState::Calibrating => {
                let secs = seg
                    .calibration_remaining
                    .map(|d| d.as_secs_f32().ceil() as u32)
                    .unwrap_or(0);
                text(
                    &mut canvas,
                    &format!("CALIBRATING: hold still... {}", secs),
                    Point::new(50, 50),
                    1.0,
                    Scalar::new(0.0, 255.0, 255.0, 0.0), // Yellow
                )?;
            }
            RecorderState::Idle => {
                let prompt = if seg.threshold.is_some() {
                    format!("Ready. Sign: {}", status.label)
                } else {
                    format!("Press R to record: {}", status.label)
                };
                text(
                    &mut canvas,
                    &prompt,
                    Point::new(50, 50),
                    1.0,
                    Scalar::new(0.0, 255.0, 0.0, 0.0), // Green
                )?;
            }
            RecorderState::Recording => {
                imgproc::circle(
                    &mut canvas,
                    Point::new(30, 30),
                    20,
                    Scalar::new(0.0, 0.0, 255.0, 0.0),
                    -1,
                    LINE_8,
                    0,
                )?;
                let frames = seg.clip_frames.unwrap_or(0);
                text(
                    &mut canvas,
                    &format!("REC {}", frames),
                    Point::new(60, 40),
                    1.0,
                    Scalar::new(0.0, 0.0, 255.0, 0.0), // Red
                )?;
            }
            RecorderState::Ending => {
                text(
                    &mut canvas,
                    "Hold still to finish...",
                    Point::new(50, height.saturating_sub(30)),
                    0.7,
                    Scalar::new(255.0, 0.0, 0.0, 0.0), // Blue
                )?;
            }
        }

        // Skeleton, then wrists and the neutral reference on top
        for (a, b) in skeleton_segments(&status.landmarks) {
            let (start, end) = (to_pixel(&canvas, a), to_pixel(&canvas, b));
            imgproc::line(
                &mut canvas,
                start,
                end,
                Scalar::new(0.0, 255.0, 255.0, 0.0),
                2,
                LINE_8,
                0,
            )?;
        }
        for p in status.landmarks.keypoints.iter().flatten() {
            dot(&mut canvas, *p, 3, Scalar::new(0.0, 255.0, 0.0, 0.0))?;
        }
        if let Some(wrists) = status.landmarks.wrists {
            for p in [wrists.left, wrists.right] {
                dot(&mut canvas, p, 6, Scalar::new(121.0, 44.0, 250.0, 0.0))?;
            }
        }
        if let Some(neutral) = seg.neutral {
            dot(&mut canvas, neutral, 4, Scalar::new(255.0, 255.0, 0.0, 0.0))?;
        }

        // Displacement bar with the threshold marker
        if let (Some(d), Some(threshold)) = (seg.displacement, seg.threshold) {
            let bar_y = height.saturating_sub(80);
            let bar_len = ((d * BAR_SCALE) as i32).clamp(0, width);
            let color = if d < threshold {
                Scalar::new(0.0, 255.0, 0.0, 0.0)
            } else {
                Scalar::new(0.0, 0.0, 255.0, 0.0)
            };
            if bar_len > 0 {
                imgproc::rectangle(
                    &mut canvas,
                    Rect::new(50, bar_y, bar_len, 20),
                    color,
                    -1,
                    LINE_8,
                    0,
                )?;
            }
            let marker_x = 50 + (threshold * BAR_SCALE) as i32;
            imgproc::rectangle(
                &mut canvas,
                Rect::new(marker_x, bar_y - 10, 2, 40),
                Scalar::new(255.0, 255.0, 0.0, 0.0),
                2,
                LINE_8,
                0,
            )?;
        }

        text(
            &mut canvas,
            &format!("saved: {}", status.clips_saved),
            Point::new(width.saturating_sub(160), 30),
            0.6,
            Scalar::new(255.0, 255.0, 255.0, 0.0),
        )?;

        if let Some(err) = &status.last_error {
            text(
                &mut canvas,
                err,
                Point::new(10, height.saturating_sub(10)),
                0.5,
                Scalar::new(0.0, 0.0, 255.0, 0.0),
            )?;
        }

        Ok(canvas)
    }

    fn present(&self, canvas: &Mat, wait_ms: i32) -> Result<Option<Command>> {
        highgui::imshow(&self.title, canvas)?;
        let key = highgui::wait_key(wait_ms)?;
        Ok(match key {
            KEY_ESC => Some(Command::Quit),
            k if k == i32::from(b'q') => Some(Command::Quit),
            k if k == i32::from(b'r') || k == i32::from(b'R') => Some(Command::StartRecording),
            _ => None,
        })
    }
}

impl StatusDisplay<Mat> for OverlayWindow {
    fn show(&mut self, frame: &Mat, status: &StatusView) -> Result<Option<Command>> {
        let canvas = self.render(frame, status)?;
        self.present(&canvas, 1)
    }

    fn confirm_clip(&mut self, frame: &Mat, status: &StatusView) -> Result<Option<Command>> {
        let mut canvas = self.render(frame, status)?;
        let border = Rect::new(0, 0, canvas.cols(), canvas.rows());
        imgproc::rectangle(
            &mut canvas,
            border,
            Scalar::new(0.0, 255.0, 0.0, 0.0),
            10,
            LINE_8,
            0,
        )?;
        self.present(&canvas, self.confirm_pause_ms)
    }
}

impl Drop for OverlayWindow {
    fn drop(&mut self) {
        let _ = highgui::destroy_window(&self.title);
    }
}

fn text(canvas: &mut Mat, content: &str, org: Point, scale: f64, color: Scalar) -> Result<()> {
    imgproc::put_text(
        canvas,
        content,
        org,
        FONT_HERSHEY_SIMPLEX,
        scale,
        color,
        2,
        LINE_8,
        false,
    )?;
    Ok(())
}

fn to_pixel(canvas: &Mat, p: NormPoint) -> Point {
    Point::new(
        (p.x * canvas.cols() as f32) as i32,
        (p.y * canvas.rows() as f32) as i32,
    )
}

fn dot(canvas: &mut Mat, p: NormPoint, radius: i32, color: Scalar) -> Result<()> {
    let center = to_pixel(canvas, p);
    imgproc::circle(canvas, center, radius, color, -1, LINE_8, 0)?;
    Ok(())
}
