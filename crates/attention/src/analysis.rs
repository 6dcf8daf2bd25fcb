//! Frame classification and status output

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::{AttentionConfig, ClassifierMode, LostSubjectPolicy};
use crate::estimator::{EyeStateEstimator, FrameObservation};
use crate::geometry::BoundingBox;
use crate::AttentionError;
use crate::state::{AttentionLabel, AttentionState, ClosureDebouncer, ClosureState};

pub const LABEL_NO_FACE: &str = "Distracted (No face detected)";
pub const LABEL_NO_EYES: &str = "Distracted (Eyes not detected)";
pub const LABEL_EYES_NOT_VISIBLE: &str = "Distracted (Eyes not visible)";
pub const LABEL_ATTENTIVE: &str = "ATTENTIVE";
pub const LABEL_PRESENT: &str = "Attentive";
pub const LABEL_CAMERA_ERROR: &str = "CAMERA ERROR";

/// Extra marker rendered while the alarm is active
pub const ALARM_MARKER: &str = "ALARM!";

/// Detector result for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorOutput {
    /// First detected face, if any
    #[serde(default)]
    pub face: Option<BoundingBox>,

    /// Eye regions in detector order
    #[serde(default)]
    pub eyes: Vec<BoundingBox>,
}

/// Status color, ordered by urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeverityColor {
    Green,
    Orange,
    Red,
}

impl SeverityColor {
    /// RGB triple for renderers
    pub fn rgb(&self) -> (u8, u8, u8) {
        match self {
            SeverityColor::Green => (0, 255, 0),
            SeverityColor::Orange => (255, 165, 0),
            SeverityColor::Red => (255, 0, 0),
        }
    }
}

/// Per-frame status consumed by the display layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameStatus {
    /// Human readable status line
    pub label: String,

    pub severity: SeverityColor,

    /// Whether the alarm marker should be shown
    pub alarm_active: bool,

    /// Label kind, `None` for frames that never reached the classifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<AttentionLabel>,

    /// Whole seconds of the current closure episode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_secs: Option<u64>,

    /// Inputs the decision was made from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation: Option<FrameObservation>,
}

impl FrameStatus {
    fn new(label: impl Into<String>, severity: SeverityColor, kind: AttentionLabel) -> Self {
        Self {
            label: label.into(),
            severity,
            alarm_active: false,
            kind: Some(kind),
            closed_secs: None,
            observation: None,
        }
    }

    /// Status for a frame the capture layer failed to deliver
    pub fn camera_error() -> Self {
        Self {
            label: LABEL_CAMERA_ERROR.to_string(),
            severity: SeverityColor::Red,
            alarm_active: false,
            kind: None,
            closed_secs: None,
            observation: None,
        }
    }

    fn from_closure(closure: ClosureState) -> Self {
        let secs = closure.closed_for().as_secs();
        match closure {
            ClosureState::Attentive => {
                FrameStatus::new(LABEL_ATTENTIVE, SeverityColor::Green, AttentionLabel::Attentive)
            }
            ClosureState::Warning { .. } => {
                FrameStatus {
                    closed_secs: Some(secs),
                    ..FrameStatus::new(
                        format!("Warning ({}s)", secs),
                        SeverityColor::Orange,
                        AttentionLabel::Warning,
                    )
                }
            }
            ClosureState::Alarm { .. } => {
                FrameStatus {
                    alarm_active: true,
                    closed_secs: Some(secs),
                    ..FrameStatus::new(
                        format!("DISTRACTED ({}s)", secs),
                        SeverityColor::Red,
                        AttentionLabel::Alarm,
                    )
                }
            }
        }
    }

    /// Status line with the alarm marker appended when active
    pub fn display_line(&self) -> String {
        if self.alarm_active {
            format!("{} {}", self.label, ALARM_MARKER)
        } else {
            self.label.clone()
        }
    }

    /// Status line wrapped in a 24-bit ANSI color for the severity
    pub fn colored_line(&self) -> String {
        let (r, g, b) = self.severity.rgb();
        format!("\x1b[38;2;{};{};{}m{}\x1b[0m", r, g, b, self.display_line())
    }
}

/// Frame classifier: detector output plus session state to status
#[derive(Debug, Clone)]
pub struct FrameClassifier {
    mode: ClassifierMode,
    lost_subject_policy: LostSubjectPolicy,
    estimator: EyeStateEstimator,
    debouncer: ClosureDebouncer,
}

impl FrameClassifier {
    pub fn new(config: &AttentionConfig) -> Result<Self, AttentionError> {
        Ok(Self {
            mode: config.mode,
            lost_subject_policy: config.lost_subject_policy,
            estimator: EyeStateEstimator::new(config.max_eyes),
            debouncer: ClosureDebouncer::new(config)?,
        })
    }

    pub fn debouncer(&self) -> &ClosureDebouncer {
        &self.debouncer
    }

    /// Classify one frame. First match wins: no face, too few usable eyes,
    /// then the closure debouncer. Only the last branch advances the timer.
    pub fn classify(
        &self,
        state: &mut AttentionState,
        output: &DetectorOutput,
        now: Duration,
    ) -> FrameStatus {
        let observation = self.estimator.observe(output);

        let status = match self.mode {
            ClassifierMode::EyeClosure => self.classify_closure(state, &observation, now),
            ClassifierMode::PresenceOnly => self.classify_presence(&observation),
        };

        if let Some(kind) = status.kind {
            state.current_label = kind;
        }

        FrameStatus {
            observation: Some(observation),
            ..status
        }
    }

    fn classify_closure(
        &self,
        state: &mut AttentionState,
        observation: &FrameObservation,
        now: Duration,
    ) -> FrameStatus {
        if !observation.face_detected {
            self.on_subject_lost(state);
            return FrameStatus::new(LABEL_NO_FACE, SeverityColor::Red, AttentionLabel::DistractedNoFace);
        }

        match observation.avg_openness {
            Some(avg) => FrameStatus::from_closure(self.debouncer.update(state, avg, now)),
            None => {
                self.on_subject_lost(state);
                FrameStatus::new(LABEL_NO_EYES, SeverityColor::Red, AttentionLabel::DistractedNoEyes)
            }
        }
    }

    fn classify_presence(&self, observation: &FrameObservation) -> FrameStatus {
        if !observation.face_detected {
            FrameStatus::new(LABEL_NO_FACE, SeverityColor::Red, AttentionLabel::DistractedNoFace)
        } else if observation.eye_count >= 1 {
            FrameStatus::new(LABEL_PRESENT, SeverityColor::Green, AttentionLabel::Attentive)
        } else {
            FrameStatus::new(
                LABEL_EYES_NOT_VISIBLE,
                SeverityColor::Red,
                AttentionLabel::DistractedNoEyes,
            )
        }
    }

    fn on_subject_lost(&self, state: &mut AttentionState) {
        if self.lost_subject_policy == LostSubjectPolicy::ResetTimer && state.is_tracking_closure() {
            debug!("Subject lost, closure timer reset");
            state.clear_closure();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face() -> Option<BoundingBox> {
        Some(BoundingBox::new(100.0, 100.0, 200.0, 200.0))
    }

    fn eyes(openness: f32) -> Vec<BoundingBox> {
        vec![
            BoundingBox::new(20.0, 40.0, 40.0, 40.0 * openness),
            BoundingBox::new(120.0, 40.0, 40.0, 40.0 * openness),
        ]
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_no_face_ignores_eyes() {
        let classifier = FrameClassifier::new(&AttentionConfig::default()).unwrap();
        let mut state = AttentionState::default();

        for eye_boxes in [vec![], eyes(0.05), eyes(0.5)] {
            let output = DetectorOutput { face: None, eyes: eye_boxes };
            let status = classifier.classify(&mut state, &output, secs(0));
            assert_eq!(status.label, LABEL_NO_FACE);
            assert_eq!(status.severity, SeverityColor::Red);
            assert!(!status.alarm_active);
        }
        assert_eq!(state.closure_start, None);
        assert_eq!(state.current_label, AttentionLabel::DistractedNoFace);
    }

    #[test]
    fn test_single_eye_not_delegated() {
        let classifier = FrameClassifier::new(&AttentionConfig::default()).unwrap();
        let mut state = AttentionState::default();
        let output = DetectorOutput {
            face: face(),
            eyes: vec![BoundingBox::new(20.0, 40.0, 40.0, 2.0)],
        };

        let status = classifier.classify(&mut state, &output, secs(0));
        assert_eq!(status.label, LABEL_NO_EYES);
        assert_eq!(status.severity, SeverityColor::Red);
        assert_eq!(state.consecutive_low_frames, 0);
        assert_eq!(state.closure_start, None);
    }

    #[test]
    fn test_attentive_status() {
        let classifier = FrameClassifier::new(&AttentionConfig::default()).unwrap();
        let mut state = AttentionState::default();
        let output = DetectorOutput { face: face(), eyes: eyes(0.4) };

        let status = classifier.classify(&mut state, &output, secs(0));
        assert_eq!(status.label, "ATTENTIVE");
        assert_eq!(status.severity, SeverityColor::Green);
        assert_eq!(status.kind, Some(AttentionLabel::Attentive));
    }

    #[test]
    fn test_warning_and_alarm_labels() {
        let classifier = FrameClassifier::new(&AttentionConfig::default()).unwrap();
        let mut state = AttentionState::default();
        let output = DetectorOutput { face: face(), eyes: eyes(0.1) };

        let status = classifier.classify(&mut state, &output, Duration::from_millis(0));
        assert_eq!(status.label, "Warning (0s)");
        assert_eq!(status.severity, SeverityColor::Orange);

        let status = classifier.classify(&mut state, &output, Duration::from_millis(6_900));
        assert_eq!(status.label, "Warning (6s)");
        assert_eq!(status.closed_secs, Some(6));

        let status = classifier.classify(&mut state, &output, Duration::from_millis(11_200));
        assert_eq!(status.label, "DISTRACTED (11s)");
        assert_eq!(status.severity, SeverityColor::Red);
        assert!(status.alarm_active);
        assert_eq!(status.display_line(), "DISTRACTED (11s) ALARM!");
    }

    #[test]
    fn test_missing_eyes_keep_timer_running() {
        let classifier = FrameClassifier::new(&AttentionConfig::default()).unwrap();
        let mut state = AttentionState::default();
        let closed = DetectorOutput { face: face(), eyes: eyes(0.1) };
        let no_eyes = DetectorOutput { face: face(), eyes: vec![] };

        classifier.classify(&mut state, &closed, secs(0));
        classifier.classify(&mut state, &no_eyes, secs(4));
        classifier.classify(&mut state, &DetectorOutput::default(), secs(8));
        assert_eq!(state.closure_start, Some(secs(0)));
        assert_eq!(state.consecutive_low_frames, 1);

        let status = classifier.classify(&mut state, &closed, secs(10));
        assert!(status.alarm_active);
    }

    #[test]
    fn test_reset_policy_clears_timer() {
        let config = AttentionConfig {
            lost_subject_policy: LostSubjectPolicy::ResetTimer,
            ..Default::default()
        };
        let classifier = FrameClassifier::new(&config).unwrap();
        let mut state = AttentionState::default();
        let closed = DetectorOutput { face: face(), eyes: eyes(0.1) };

        classifier.classify(&mut state, &closed, secs(0));
        classifier.classify(&mut state, &DetectorOutput::default(), secs(4));
        assert_eq!(state.closure_start, None);

        let status = classifier.classify(&mut state, &closed, secs(10));
        assert_eq!(status.label, "Warning (0s)");
    }

    #[test]
    fn test_presence_only_mode() {
        let config = AttentionConfig {
            mode: ClassifierMode::PresenceOnly,
            ..Default::default()
        };
        let classifier = FrameClassifier::new(&config).unwrap();
        let mut state = AttentionState::default();

        let one_eye = DetectorOutput {
            face: face(),
            eyes: vec![BoundingBox::new(0.0, 0.0, 40.0, 1.0)],
        };
        let status = classifier.classify(&mut state, &one_eye, secs(0));
        assert_eq!(status.label, LABEL_PRESENT);
        assert_eq!(status.severity, SeverityColor::Green);

        let status = classifier.classify(&mut state, &DetectorOutput { face: face(), eyes: vec![] }, secs(1));
        assert_eq!(status.label, LABEL_EYES_NOT_VISIBLE);

        // Closed eyes never escalate in this mode
        let closed = DetectorOutput { face: face(), eyes: eyes(0.05) };
        let status = classifier.classify(&mut state, &closed, secs(60));
        assert_eq!(status.label, LABEL_PRESENT);
        assert_eq!(state.closure_start, None);
    }

    #[test]
    fn test_severity_order() {
        assert!(SeverityColor::Green < SeverityColor::Orange);
        assert!(SeverityColor::Orange < SeverityColor::Red);
        assert_eq!(SeverityColor::Red.rgb(), (255, 0, 0));
    }

    #[test]
    fn test_colored_line() {
        let classifier = FrameClassifier::new(&AttentionConfig::default()).unwrap();
        let mut state = AttentionState::default();
        let lost = DetectorOutput::default();
        let status = classifier.classify(&mut state, &lost, secs(0));

        let (r, g, b) = SeverityColor::Red.rgb();
        assert_eq!(status.severity, SeverityColor::Red);
        assert_eq!(
            status.colored_line(),
            format!("\x1b[38;2;{};{};{}m{}\x1b[0m", r, g, b, status.display_line())
        );
    }
}
