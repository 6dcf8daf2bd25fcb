//! Closure timing and alarm escalation

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::AttentionConfig;
use crate::estimator::eyes_closed;
use crate::AttentionError;

/// Status label kind of the most recent frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttentionLabel {
    #[default]
    Attentive,
    Warning,
    Alarm,
    DistractedNoFace,
    DistractedNoEyes,
}

/// Debouncer verdict for one frame with usable eyes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureState {
    /// Eyes open
    Attentive,
    /// Eyes closed for less than the alarm trigger time
    Warning { closed_for: Duration },
    /// Eyes closed for at least the alarm trigger time
    Alarm { closed_for: Duration },
}

impl ClosureState {
    pub fn label(&self) -> AttentionLabel {
        match self {
            ClosureState::Attentive => AttentionLabel::Attentive,
            ClosureState::Warning { .. } => AttentionLabel::Warning,
            ClosureState::Alarm { .. } => AttentionLabel::Alarm,
        }
    }

    /// Closure time so far, zero when attentive
    pub fn closed_for(&self) -> Duration {
        match self {
            ClosureState::Attentive => Duration::ZERO,
            ClosureState::Warning { closed_for } | ClosureState::Alarm { closed_for } => *closed_for,
        }
    }
}

/// Session state, carried across frames
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttentionState {
    /// Frames in a row with openness below threshold
    pub consecutive_low_frames: u32,

    /// Timestamp of the first low frame of the current closure episode
    pub closure_start: Option<Duration>,

    /// Label of the last classified frame
    pub current_label: AttentionLabel,
}

impl AttentionState {
    /// Reset state (on session restart)
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Clear the closure episode
    pub fn clear_closure(&mut self) {
        self.consecutive_low_frames = 0;
        self.closure_start = None;
    }

    /// Whether a closure episode is being timed
    pub fn is_tracking_closure(&self) -> bool {
        self.closure_start.is_some()
    }
}

/// Eye closure debouncer.
///
/// Holds only thresholds; all mutable data lives in [`AttentionState`] so the
/// machine can be driven with synthetic timestamps.
#[derive(Debug, Clone)]
pub struct ClosureDebouncer {
    threshold: f32,
    consec_frames: u32,
    alarm_trigger: Duration,
}

impl ClosureDebouncer {
    pub fn new(config: &AttentionConfig) -> Result<Self, AttentionError> {
        Ok(Self {
            threshold: config.eye_ar_thresh,
            consec_frames: config.consec_frames,
            alarm_trigger: config.alarm_trigger_time()?,
        })
    }

    /// Whether the low-frame count has reached the debounce length.
    /// Informational only; escalation is driven by elapsed time.
    pub fn is_debounced(&self, state: &AttentionState) -> bool {
        state.consecutive_low_frames >= self.consec_frames
    }

    /// Advance the machine by one frame.
    ///
    /// The timer starts on the first low frame, not once `consec_frames` is
    /// reached.
    pub fn update(&self, state: &mut AttentionState, avg_openness: f32, now: Duration) -> ClosureState {
        if !eyes_closed(avg_openness, self.threshold) {
            state.clear_closure();
            state.current_label = AttentionLabel::Attentive;
            return ClosureState::Attentive;
        }

        state.consecutive_low_frames = state.consecutive_low_frames.saturating_add(1);
        if state.consecutive_low_frames == self.consec_frames {
            debug!("Eye closure debounced after {} frames", self.consec_frames);
        }

        let start = *state.closure_start.get_or_insert(now);
        if now < start {
            warn!("Timestamp {:?} precedes closure start {:?}", now, start);
        }
        let closed_for = now.saturating_sub(start);

        let result = if closed_for >= self.alarm_trigger {
            ClosureState::Alarm { closed_for }
        } else {
            ClosureState::Warning { closed_for }
        };
        state.current_label = result.label();
        result
    }
}
