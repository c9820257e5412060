//! Clock utilities for recording sessions.
//!
//! A recording is anchored to a monotonic epoch taken when the capture
//! framework acknowledged the start, plus the wall-clock time of that moment
//! for status reporting.

use std::time::Instant;

use chrono::{DateTime, Utc};

/// A recording clock that provides monotonic timestamps relative to
/// a fixed epoch (the moment recording started).
#[derive(Debug, Clone)]
pub struct RecordingClock {
    /// The instant recording started.
    epoch: Instant,

    /// Wall-clock time at epoch.
    epoch_wall: DateTime<Utc>,
}

impl RecordingClock {
    /// Create a new recording clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: Utc::now(),
        }
    }

    /// Get seconds elapsed since recording start.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at recording start.
    pub fn epoch_wall(&self) -> DateTime<Utc> {
        self.epoch_wall
    }
}

/// File name for a recording started at `at`: `<prefix>_<unix-millis>.<ext>`.
pub fn recording_file_name(prefix: &str, at: DateTime<Utc>, extension: &str) -> String {
    format!("{prefix}_{}.{extension}", at.timestamp_millis())
}
