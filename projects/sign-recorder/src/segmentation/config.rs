use anyhow::{anyhow, ensure, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How a frame without landmarks is read once the neutral position is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingLandmarkPolicy {
    /// Read as zero displacement (drifts toward the stop path)
    #[default]
    Zero,
    /// Reuse the last valid displacement
    Hold,
    /// Skip the frame: no transition, no timer check, not appended
    Pause,
}

impl FromStr for MissingLandmarkPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "zero" => Ok(Self::Zero),
            "hold" => Ok(Self::Hold),
            "pause" => Ok(Self::Pause),
            other => Err(anyhow!(
                "Unknown missing-landmark policy '{}' (expected zero, hold or pause)",
                other
            )),
        }
    }
}

impl fmt::Display for MissingLandmarkPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Zero => "zero",
            Self::Hold => "hold",
            Self::Pause => "pause",
        };
        f.write_str(s)
    }
}

/// Tunables for the automatic segmentation controller
#[derive(Debug, Clone)]
pub struct SegmentationConfig {
    /// Displacement (normalized units) that counts as movement
    pub movement_threshold: f32,

    /// Continuous stillness required to end a clip
    pub cooldown: Duration,

    /// How long the operator holds still before the neutral pose is sampled
    pub calibration_window: Duration,

    pub missing_landmarks: MissingLandmarkPolicy,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            movement_threshold: 0.15,
            cooldown: Duration::from_secs(1),
            calibration_window: Duration::from_secs(3),
            missing_landmarks: MissingLandmarkPolicy::Zero,
        }
    }
}

impl SegmentationConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.movement_threshold.is_finite() && self.movement_threshold > 0.0,
            "movement threshold must be a positive number, got {}",
            self.movement_threshold
        );
        ensure!(
            !self.cooldown.is_zero(),
            "cooldown interval must be greater than zero"
        );
        Ok(())
    }
}
