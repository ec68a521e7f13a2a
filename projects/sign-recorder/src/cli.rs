use crate::segmentation::{manual::DEFAULT_CLIP_FRAMES, MissingLandmarkPolicy, SegmentationConfig};
use anyhow::{ensure, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Start and stop clips from wrist movement
    Auto,
    /// Start clips with the R key; each clip has a fixed length
    Manual,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Sign being recorded; clips go to <dataset-root>/<label>/
    #[arg(long, env = "SIGN_RECORDER_LABEL")]
    pub label: String,

    /// Root directory of the dataset
    #[arg(long, env = "SIGN_RECORDER_DATASET_ROOT", default_value = "output_videos")]
    pub dataset_root: PathBuf,

    /// CSV catalog shared by all labels
    #[arg(long, env = "SIGN_RECORDER_METADATA_FILE", default_value = "metadata.csv")]
    pub metadata_file: PathBuf,

    #[arg(long, value_enum, env = "SIGN_RECORDER_MODE", default_value_t = Mode::Auto)]
    pub mode: Mode,

    /// Camera device index
    #[arg(long, env = "SIGN_RECORDER_CAMERA", default_value_t = 0)]
    pub camera: i32,

    /// Replay a video file instead of the camera
    #[arg(long, env = "SIGN_RECORDER_INPUT")]
    pub input: Option<PathBuf>,

    /// YOLO pose model (ONNX)
    #[arg(long, env = "SIGN_RECORDER_MODEL", default_value = "yolov8n-pose.onnx")]
    pub model: String,

    #[arg(long, env = "SIGN_RECORDER_MOVEMENT_THRESHOLD", default_value_t = 0.15)]
    pub movement_threshold: f32,

    /// Stillness needed to end a clip
    #[arg(long, env = "SIGN_RECORDER_COOLDOWN_SECS", default_value_t = 1.0)]
    pub cooldown_secs: f64,

    /// Hold-still time before the neutral pose is sampled
    #[arg(long, env = "SIGN_RECORDER_CALIBRATION_SECS", default_value_t = 3.0)]
    pub calibration_secs: f64,

    /// How frames without wrists are read: zero, hold or pause
    #[arg(long, env = "SIGN_RECORDER_MISSING_LANDMARKS", default_value_t = MissingLandmarkPolicy::Zero)]
    pub missing_landmarks: MissingLandmarkPolicy,

    /// Keypoints below this confidence count as missing
    #[arg(long, env = "SIGN_RECORDER_MIN_KEYPOINT_CONFIDENCE", default_value_t = 0.5)]
    pub min_keypoint_confidence: f32,

    /// Clip length in manual mode
    #[arg(long, env = "SIGN_RECORDER_CLIP_FRAMES", default_value_t = DEFAULT_CLIP_FRAMES)]
    pub clip_frames: usize,

    /// Frame rate written into the clips
    #[arg(long, env = "SIGN_RECORDER_FPS", default_value_t = 30.0)]
    pub fps: f64,

    /// How long the saved-clip confirmation stays on screen
    #[arg(long, env = "SIGN_RECORDER_CONFIRM_PAUSE_MS", default_value_t = 500)]
    pub confirm_pause_ms: u64,

    /// Do not flip the camera image horizontally
    #[arg(long)]
    pub no_mirror: bool,

    /// Run without a window (file input only)
    #[arg(long, requires = "input")]
    pub headless: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn segmentation_config(&self) -> Result<SegmentationConfig> {
        ensure!(
            self.cooldown_secs.is_finite() && self.cooldown_secs > 0.0,
            "Cooldown must be a positive number of seconds"
        );
        ensure!(
            self.calibration_secs.is_finite() && self.calibration_secs >= 0.0,
            "Calibration time must be a non-negative number of seconds"
        );

        let config = SegmentationConfig {
            movement_threshold: self.movement_threshold,
            cooldown: Duration::from_secs_f64(self.cooldown_secs),
            calibration_window: Duration::from_secs_f64(self.calibration_secs),
            missing_landmarks: self.missing_landmarks,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.clip_frames > 0, "--clip-frames must be at least 1");
        ensure!(
            self.fps.is_finite() && self.fps > 0.0,
            "--fps must be a positive number"
        );
        ensure!(
            (0.0..=1.0).contains(&self.min_keypoint_confidence),
            "--min-keypoint-confidence must be between 0 and 1"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["sign-recorder", "--label", "hola"]).unwrap();
        assert_eq!(args.mode, Mode::Auto);
        assert_eq!(args.dataset_root, PathBuf::from("output_videos"));
        assert_eq!(args.metadata_file, PathBuf::from("metadata.csv"));
        assert_eq!(args.clip_frames, 30);
        assert!(!args.headless);

        let config = args.segmentation_config().unwrap();
        assert_eq!(config.cooldown, Duration::from_secs(1));
        assert_eq!(config.calibration_window, Duration::from_secs(3));
        assert_eq!(config.missing_landmarks, MissingLandmarkPolicy::Zero);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_manual_mode_and_policy() {
        let args = Args::try_parse_from([
            "sign-recorder",
            "--label",
            "gracias",
            "--mode",
            "manual",
            "--missing-landmarks",
            "pause",
            "--clip-frames",
            "45",
        ])
        .unwrap();
        assert_eq!(args.mode, Mode::Manual);
        assert_eq!(args.missing_landmarks, MissingLandmarkPolicy::Pause);
        assert_eq!(args.clip_frames, 45);
    }

    #[test]
    fn test_headless_requires_input() {
        assert!(Args::try_parse_from(["sign-recorder", "--label", "hola", "--headless"]).is_err());
        let args = Args::try_parse_from([
            "sign-recorder",
            "--label",
            "hola",
            "--headless",
            "--input",
            "session.mp4",
        ])
        .unwrap();
        assert!(args.headless);
    }

    #[test]
    fn test_rejects_bad_tunables() {
        let args = Args::try_parse_from([
            "sign-recorder",
            "--label",
            "hola",
            "--movement-threshold",
            "0",
        ])
        .unwrap();
        assert!(args.segmentation_config().is_err());

        let args =
            Args::try_parse_from(["sign-recorder", "--label", "hola", "--cooldown-secs", "0"])
                .unwrap();
        let err = args.segmentation_config().unwrap_err();
        assert!(err.to_string().contains("positive"));

        let args =
            Args::try_parse_from(["sign-recorder", "--label", "hola", "--clip-frames", "0"])
                .unwrap();
        assert!(args.validate().is_err());
    }
}
