//! Per-frame eye state estimation

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analysis::DetectorOutput;
use crate::geometry::{openness, EyeRegion};

/// Minimum number of detected eyes for a frame to carry an openness average
pub const REQUIRED_EYES: usize = 2;

/// Open/closed decision shared by the estimator and the closure debouncer
pub fn eyes_closed(avg_openness: f32, threshold: f32) -> bool {
    avg_openness < threshold
}

/// Openness aggregate over the eye regions of one frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EyeEstimate {
    /// Regions that produced a score
    pub usable: usize,
    /// Mean score over usable regions, 0.0 when none were usable
    pub avg_openness: f32,
}

impl EyeEstimate {
    /// Binary open/closed decision. `None` when no eye was usable, since the
    /// 0.0 sentinel must not read as a closed eye.
    pub fn is_closed(&self, threshold: f32) -> Option<bool> {
        (self.usable > 0).then(|| eyes_closed(self.avg_openness, threshold))
    }
}

/// Observation handed to the classifier for one frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameObservation {
    pub face_detected: bool,
    /// Eye regions reported by the detector, before truncation
    pub eye_count: usize,
    /// Present only with at least two detected eyes and one usable score
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_openness: Option<f32>,
}

/// Averages eye openness over the first `max_eyes` detector regions
#[derive(Debug, Clone)]
pub struct EyeStateEstimator {
    max_eyes: usize,
}

impl Default for EyeStateEstimator {
    fn default() -> Self {
        Self::new(REQUIRED_EYES)
    }
}

impl EyeStateEstimator {
    pub fn new(max_eyes: usize) -> Self {
        Self { max_eyes }
    }

    /// Average openness of the leading regions in detector order.
    ///
    /// Extra detections beyond `max_eyes` are dropped without inspection, so
    /// a false positive in first or second position still wins over a real
    /// eye further down the list. Degenerate regions are skipped.
    pub fn estimate(&self, regions: &[EyeRegion]) -> EyeEstimate {
        let mut sum = 0.0f32;
        let mut usable = 0usize;

        for region in regions.iter().take(self.max_eyes) {
            match openness(region) {
                Ok(score) => {
                    sum += score.value();
                    usable += 1;
                }
                Err(e) => warn!("Skipping eye region {:?}: {}", region, e),
            }
        }

        EyeEstimate {
            usable,
            avg_openness: if usable > 0 { sum / usable as f32 } else { 0.0 },
        }
    }

    /// Reduce raw detector output to a frame observation
    pub fn observe(&self, output: &DetectorOutput) -> FrameObservation {
        let face_detected = output.face.is_some();
        let eye_count = output.eyes.len();

        let avg_openness = if face_detected && eye_count >= REQUIRED_EYES {
            let estimate = self.estimate(&output.eyes);
            (estimate.usable > 0).then_some(estimate.avg_openness)
        } else {
            None
        };

        FrameObservation {
            face_detected,
            eye_count,
            avg_openness,
        }
    }
}
