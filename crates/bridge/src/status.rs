//! Status and result types published by the bridge.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use screenrec_common::config::{AppConfig, RecordingDefaults};
use screenrec_platform_core::SessionId;

/// The bridge's two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeState {
    Idle,
    Recording,
}

/// Consistent snapshot of the bridge's recording flag and last error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingStatus {
    /// True between an acknowledged start and the next stop or interruption.
    pub is_recording: bool,

    /// Message of the most recent framework failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Wall-clock start of the current recording.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl RecordingStatus {
    pub fn state(&self) -> BridgeState {
        if self.is_recording {
            BridgeState::Recording
        } else {
            BridgeState::Idle
        }
    }
}

/// Outcome of a successful stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSummary {
    pub session: SessionId,
    /// File the framework wrote, if it reports one.
    pub output: Option<PathBuf>,
    pub duration_secs: f64,
}

/// Parameters the bridge forwards to the framework on every start.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub output_dir: PathBuf,
    pub recording: RecordingDefaults,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for BridgeConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            recording: config.recording.clone(),
        }
    }
}
