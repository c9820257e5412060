//! Error types shared across screenrec crates.

/// Top-level error type for screenrec operations.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("A recording is already in progress")]
    AlreadyRecording,

    #[error("No recording is in progress")]
    NotRecording,

    #[error("Capture framework rejected start: {message}")]
    PlatformRejected { message: String },

    #[error("Capture framework stopped the recording: {message}")]
    PlatformFailedAsync { message: String },

    #[error("Capture framework failed to stop: {message}")]
    StopFailed { message: String },

    #[error("Screen capture unavailable: {message}")]
    Unavailable { message: String },

    #[error("Recording bridge is no longer running")]
    BridgeClosed,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using BridgeError.
pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    pub fn platform_rejected(msg: impl Into<String>) -> Self {
        Self::PlatformRejected {
            message: msg.into(),
        }
    }

    pub fn platform_failed_async(msg: impl Into<String>) -> Self {
        Self::PlatformFailedAsync {
            message: msg.into(),
        }
    }

    pub fn stop_failed(msg: impl Into<String>) -> Self {
        Self::StopFailed {
            message: msg.into(),
        }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
