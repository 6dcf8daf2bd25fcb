//! Detection sources

use attention::{BoundingBox, DetectorOutput};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::SourceError;

/// Timestamped detector output
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Monotonic capture time
    pub timestamp: Duration,
    pub output: DetectorOutput,
}

/// Producer of per-frame detector results.
///
/// Returns `None` once the stream ends and `Some(Err(_))` for a frame that
/// could not be captured; the stream continues after an error.
pub trait DetectionSource: Send + 'static {
    fn next_detection(&mut self) -> Option<Result<Detection, SourceError>>;
}

/// One recorded frame of a replay trace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceFrame {
    pub timestamp_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face: Option<BoundingBox>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub eyes: Vec<BoundingBox>,

    /// Capture failure message; face and eyes are ignored when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TraceFrame {
    /// Frame with detector results
    pub fn detected(timestamp_ms: u64, face: Option<BoundingBox>, eyes: Vec<BoundingBox>) -> Self {
        Self {
            timestamp_ms,
            face,
            eyes,
            error: None,
        }
    }

    /// Frame the camera failed to deliver
    pub fn capture_error(timestamp_ms: u64, message: impl Into<String>) -> Self {
        Self {
            timestamp_ms,
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct Trace {
    frames: Vec<TraceFrame>,
}

/// Replays recorded detector output
pub struct ReplaySource {
    frames: std::vec::IntoIter<TraceFrame>,
}

impl ReplaySource {
    pub fn new(frames: Vec<TraceFrame>) -> Self {
        Self {
            frames: frames.into_iter(),
        }
    }

    /// Parse a JSON trace: `{"frames": [{"timestamp_ms": 0, "face": {...}, "eyes": [...]}]}`
    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        let trace: Trace = serde_json::from_str(json)?;
        Ok(Self::new(trace.frames))
    }

    /// Load a JSON trace file
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let json = std::fs::read_to_string(path)?;
        let source = Self::from_json(&json)?;
        info!("Loaded {} frames from {}", source.remaining(), path.display());
        Ok(source)
    }

    /// Frames not yet replayed
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl DetectionSource for ReplaySource {
    fn next_detection(&mut self) -> Option<Result<Detection, SourceError>> {
        let frame = self.frames.next()?;

        if let Some(message) = frame.error {
            return Some(Err(SourceError::Capture(message)));
        }

        Some(Ok(Detection {
            timestamp: Duration::from_millis(frame.timestamp_ms),
            output: DetectorOutput {
                face: frame.face,
                eyes: frame.eyes,
            },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trace() {
        let json = r#"{
            "frames": [
                {"timestamp_ms": 0},
                {"timestamp_ms": 66, "face": {"x": 0, "y": 0, "width": 100, "height": 100},
                 "eyes": [{"x": 10, "y": 20, "width": 20, "height": 8}]},
                {"timestamp_ms": 133, "error": "read failed"}
            ]
        }"#;
        let mut source = ReplaySource::from_json(json).unwrap();
        assert_eq!(source.remaining(), 3);

        let first = source.next_detection().unwrap().unwrap();
        assert_eq!(first.timestamp, Duration::ZERO);
        assert_eq!(first.output, DetectorOutput::default());

        let second = source.next_detection().unwrap().unwrap();
        assert_eq!(second.timestamp, Duration::from_millis(66));
        assert!(second.output.face.is_some());
        assert_eq!(second.output.eyes.len(), 1);

        assert!(matches!(
            source.next_detection(),
            Some(Err(SourceError::Capture(msg))) if msg == "read failed"
        ));
        assert!(source.next_detection().is_none());
    }

    #[test]
    fn test_malformed_trace() {
        assert!(matches!(
            ReplaySource::from_json(r#"{"frames": [{"face": null}]}"#),
            Err(SourceError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = ReplaySource::from_path(Path::new("/nonexistent/trace.json"));
        assert!(matches!(result, Err(SourceError::Io(_))));
    }
}
