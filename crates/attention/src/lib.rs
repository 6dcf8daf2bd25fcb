//! Attention State Machine
//!
//! Turns per-frame face/eye detector output into a debounced attentiveness
//! status:
//! - Eye openness from synthetic eye geometry
//! - Per-frame openness averaging over the leading eye regions
//! - Eye closure timing with Warning / Alarm escalation
//! - Frame classification into a label and severity color

pub mod analysis;
pub mod config;
pub mod estimator;
pub mod geometry;
pub mod state;

pub use analysis::{DetectorOutput, FrameClassifier, FrameStatus, SeverityColor, ALARM_MARKER};
pub use config::{AttentionConfig, ClassifierMode, LostSubjectPolicy};
pub use estimator::{EyeEstimate, EyeStateEstimator, FrameObservation};
pub use geometry::{openness, BoundingBox, EyeLandmarks, EyeRegion, GeometryError, OpennessScore};
pub use state::{AttentionLabel, AttentionState, ClosureDebouncer, ClosureState};

use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Attention core error types
#[derive(Error, Debug)]
pub enum AttentionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration: {0}")]
    ConfigLoad(#[from] ::config::ConfigError),
}

/// Attention monitor for one session.
///
/// Owns the session state; frames must be fed one at a time in timestamp
/// order.
pub struct AttentionMonitor {
    config: AttentionConfig,
    classifier: FrameClassifier,
    state: AttentionState,
}

impl AttentionMonitor {
    /// Create a new monitor with configuration
    pub fn new(config: AttentionConfig) -> Result<Self, AttentionError> {
        config.validate()?;
        info!("Creating attention monitor with config: {:?}", config);
        Ok(Self {
            classifier: FrameClassifier::new(&config)?,
            state: AttentionState::default(),
            config,
        })
    }

    /// Classify a single frame
    pub fn classify(&mut self, output: &DetectorOutput, now: Duration) -> FrameStatus {
        self.classifier.classify(&mut self.state, output, now)
    }

    /// Current session state
    pub fn state(&self) -> &AttentionState {
        &self.state
    }

    pub fn config(&self) -> &AttentionConfig {
        &self.config
    }

    /// Whether the current closure has lasted `consec_frames` frames
    pub fn is_debounced(&self) -> bool {
        self.classifier.debouncer().is_debounced(&self.state)
    }

    /// Reset session state (on monitoring restart)
    pub fn reset_state(&mut self) {
        self.state.reset();
    }
}
