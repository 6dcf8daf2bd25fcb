//! Attention Monitoring Session
//!
//! Runs the attention core against a stream of detector results:
//! - Detection worker that owns the attention state
//! - Bounded status channel to the display/control side
//! - Shared stop flag for cancellation
//! - JSON trace replay as a detection source

pub mod session;
pub mod source;

pub use session::{MonitorSession, StatusUpdate};
pub use source::{Detection, DetectionSource, ReplaySource, TraceFrame};

use attention::AttentionError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Detection source errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read trace: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse trace: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Frame capture failed: {0}")]
    Capture(String),
}

/// Session error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Detection source error: {0}")]
    Source(#[from] SourceError),

    #[error("Configuration error: {0}")]
    Config(#[from] AttentionError),

    #[error("Monitoring already running")]
    AlreadyRunning,

    #[error("Monitoring not running")]
    NotRunning,

    #[error("Detection worker failed: {0}")]
    Worker(String),
}

/// Session runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Status channel capacity (frames)
    pub status_capacity: usize,
    /// Delay between frames, 0 for none (replay pacing)
    pub frame_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            status_capacity: 64,
            frame_interval_ms: 0,
        }
    }
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}
