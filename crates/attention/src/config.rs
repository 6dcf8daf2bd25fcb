//! Attention monitor configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::AttentionError;

/// Environment variable prefix for overrides (`EDUFOCUS_EYE_AR_THRESH=0.3`)
pub const ENV_PREFIX: &str = "EDUFOCUS";

/// How the classifier turns detector output into a status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    /// Face, two eyes, and timed eye closure
    #[default]
    EyeClosure,
    /// Face and at least one eye means attentive; no timing
    PresenceOnly,
}

/// What a frame without face or eyes does to a running closure timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LostSubjectPolicy {
    /// Leave the timer alone; closure time keeps accruing across the gap
    #[default]
    KeepTimer,
    /// Clear the closure episode as if the eyes had opened
    ResetTimer,
}

/// Attention monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttentionConfig {
    /// Eye aspect ratio below which an eye counts as closed
    pub eye_ar_thresh: f32,

    /// Consecutive low frames considered debounced. Counted and reported,
    /// but the closure timer does not wait for it.
    pub consec_frames: u32,

    /// Sustained closure before the alarm fires (seconds)
    pub alarm_trigger_secs: f64,

    /// Eye regions considered per frame, in detector order
    pub max_eyes: usize,

    /// Timer handling on frames without face or eyes
    pub lost_subject_policy: LostSubjectPolicy,

    /// Classification mode
    pub mode: ClassifierMode,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            eye_ar_thresh: 0.25,
            consec_frames: 3,
            alarm_trigger_secs: 10.0,
            max_eyes: 2,
            lost_subject_policy: LostSubjectPolicy::KeepTimer,
            mode: ClassifierMode::EyeClosure,
        }
    }
}

impl AttentionConfig {
    /// Create strict config (earlier alarm, more sensitive threshold)
    pub fn strict() -> Self {
        Self {
            eye_ar_thresh: 0.28,
            alarm_trigger_secs: 5.0,
            ..Default::default()
        }
    }

    /// Create lenient config (later alarm)
    pub fn lenient() -> Self {
        Self {
            eye_ar_thresh: 0.22,
            alarm_trigger_secs: 20.0,
            ..Default::default()
        }
    }

    /// Alarm trigger time as a duration
    pub fn alarm_trigger_time(&self) -> Result<Duration, AttentionError> {
        Duration::try_from_secs_f64(self.alarm_trigger_secs).map_err(|e| {
            AttentionError::Config(format!(
                "alarm_trigger_secs {} is not a valid duration: {}",
                self.alarm_trigger_secs, e
            ))
        })
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), AttentionError> {
        if !self.eye_ar_thresh.is_finite() || self.eye_ar_thresh < 0.0 {
            return Err(AttentionError::Config(format!(
                "eye_ar_thresh must be finite and non-negative, got {}",
                self.eye_ar_thresh
            )));
        }
        if !self.alarm_trigger_secs.is_finite() || self.alarm_trigger_secs <= 0.0 {
            return Err(AttentionError::Config(format!(
                "alarm_trigger_secs must be positive, got {}",
                self.alarm_trigger_secs
            )));
        }
        self.alarm_trigger_time()?;
        if self.max_eyes == 0 {
            return Err(AttentionError::Config("max_eyes must be at least 1".into()));
        }
        Ok(())
    }

    /// Load configuration from defaults, an optional file, and `EDUFOCUS_*`
    /// environment variables, in increasing precedence.
    pub fn load(path: Option<&Path>) -> Result<Self, AttentionError> {
        let mut builder =
            ::config::Config::builder().add_source(::config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            info!("Loading attention config from {}", path.display());
            builder = builder.add_source(::config::File::from(path));
        }

        let loaded: Self = builder
            .add_source(::config::Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }
}
