use super::PoseSource;
use crate::segmentation::{LandmarkSnapshot, Point, BODY_KEYPOINTS};
use anyhow::{anyhow, Result};
use image::{DynamicImage, ImageBuffer, Rgb};
use opencv::core::Mat;
use opencv::prelude::*;
use usls::models::YOLO;
use usls::{Config, Image};

/// COCO-17 keypoint indices
const LEFT_WRIST: usize = 9;
const RIGHT_WRIST: usize = 10;

/// A wrapper around the USLS YOLO pose model that handles BGR-to-RGB conversion
/// and reduces the first detected person to a normalized wrist pair.
pub struct UslsPoseSource {
    model: YOLO,
    min_confidence: f32,
}

impl UslsPoseSource {
    /// Create a new pose source with the given model path.
    pub fn new(model_path: &str, min_confidence: f32) -> Result<Self> {
        let config = Config::yolo_pose().with_model_file(model_path);

        #[cfg(target_os = "macos")]
        let config = config.with_model_device(usls::Device::CoreMl);

        let config = config.commit()?;
        let model = YOLO::new(config)?;
        tracing::info!("Loaded pose model from {}", model_path);

        Ok(Self {
            model,
            min_confidence,
        })
    }

    fn try_detect(&mut self, frame: &Mat) -> Result<LandmarkSnapshot> {
        let width = frame.cols() as f32;
        let height = frame.rows() as f32;
        if width <= 0.0 || height <= 0.0 {
            return Ok(LandmarkSnapshot::absent());
        }

        let image = Image::from(mat_to_dynamic_image(frame)?);
        let ys = self.model.forward(&[image])?;

        let Some(y) = ys.into_iter().next() else {
            return Ok(LandmarkSnapshot::absent());
        };
        // Single signer: the first (most confident) person is the one we track
        let Some(person) = y.keypointss.first() else {
            return Ok(LandmarkSnapshot::absent());
        };

        let mut keypoints = [None; BODY_KEYPOINTS];
        for (slot, kpt) in keypoints.iter_mut().zip(person.iter()) {
            if kpt.confidence().unwrap_or(0.0) >= self.min_confidence {
                *slot = Some(Point::new(kpt.x() / width, kpt.y() / height));
            }
        }

        let snapshot = match (keypoints[LEFT_WRIST], keypoints[RIGHT_WRIST]) {
            (Some(left), Some(right)) => LandmarkSnapshot::from_wrists(left, right),
            _ => LandmarkSnapshot::absent(),
        };
        Ok(snapshot.with_keypoints(keypoints))
    }
}

impl PoseSource<Mat> for UslsPoseSource {
    fn detect(&mut self, frame: &Mat) -> LandmarkSnapshot {
        match self.try_detect(frame) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Pose inference failed, treating frame as empty: {}", e);
                LandmarkSnapshot::absent()
            }
        }
    }
}

/// Convert an OpenCV Mat (BGR) to an image::DynamicImage (RGB)
fn mat_to_dynamic_image(mat: &Mat) -> Result<DynamicImage> {
    let mut rgb_mat = Mat::default();
    opencv::imgproc::cvt_color_def(mat, &mut rgb_mat, opencv::imgproc::COLOR_BGR2RGB)?;

    let width = rgb_mat.cols() as u32;
    let height = rgb_mat.rows() as u32;

    if !rgb_mat.is_continuous() {
        return Err(anyhow!("Mat is not continuous"));
    }

    let buffer = rgb_mat.data_bytes()?.to_vec();

    let img_buffer = ImageBuffer::<Rgb<u8>, _>::from_vec(width, height, buffer)
        .ok_or_else(|| anyhow!("Failed to create ImageBuffer from Mat data"))?;

    Ok(DynamicImage::ImageRgb8(img_buffer))
}
