//! screenrec platform core contracts.
//!
//! This crate defines the boundary between the recording bridge and a
//! platform capture framework: the [`CaptureFramework`] trait, the request
//! handed over on start, the errors a framework may report, and the event
//! channel through which a framework announces that it stopped on its own.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Identifier of one start/stop cycle of a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything a framework needs to begin capturing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    /// Session this capture belongs to.
    pub session: SessionId,
    /// Directory the output file is written to.
    pub output_dir: PathBuf,
    /// Output file name prefix.
    pub file_prefix: String,
    /// Target frame rate.
    pub fps: u32,
    /// Video bitrate in kbit/s.
    pub bitrate_kbps: u32,
    /// Draw the pointer into the capture.
    pub show_cursor: bool,
}

/// Category of a framework failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameworkErrorKind {
    /// The user or the OS refused capture.
    PermissionDenied,
    /// Capture is already running (here or elsewhere).
    Busy,
    /// No capture facility on this host.
    Unavailable,
    /// Anything else.
    Failed,
}

/// Error reported by a capture framework. Displays as its message only,
/// so the message can be surfaced verbatim to callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FrameworkError {
    pub kind: FrameworkErrorKind,
    pub message: String,
}

impl FrameworkError {
    pub fn new(kind: FrameworkErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
        }
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::new(FrameworkErrorKind::PermissionDenied, msg)
    }

    pub fn busy(msg: impl Into<String>) -> Self {
        Self::new(FrameworkErrorKind::Busy, msg)
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(FrameworkErrorKind::Unavailable, msg)
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self::new(FrameworkErrorKind::Failed, msg)
    }
}

/// Notification a framework posts without being asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameworkEvent {
    /// Capture for `session` ended without a stop request
    /// (system stop, another app took over, pipeline error).
    Interrupted { session: SessionId, reason: String },
}

impl FrameworkEvent {
    pub fn session(&self) -> SessionId {
        match self {
            Self::Interrupted { session, .. } => *session,
        }
    }
}

/// Delegate handle given to a framework on start. Posts into the bridge's
/// event mailbox, tagged with the session it was created for.
#[derive(Debug, Clone)]
pub struct FrameworkEvents {
    session: SessionId,
    tx: mpsc::UnboundedSender<FrameworkEvent>,
}

impl FrameworkEvents {
    pub fn new(session: SessionId, tx: mpsc::UnboundedSender<FrameworkEvent>) -> Self {
        Self { session, tx }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Report that capture ended on its own. Safe to call from any thread.
    /// Returns false if the bridge is gone.
    pub fn interrupted(&self, reason: impl Into<String>) -> bool {
        let event = FrameworkEvent::Interrupted {
            session: self.session,
            reason: reason.into(),
        };
        if self.tx.send(event).is_err() {
            tracing::debug!(session = %self.session, "Bridge dropped; interruption not delivered");
            return false;
        }
        true
    }
}

/// A platform screen-capture facility driven by the recording bridge.
///
/// The bridge owns exactly one framework and calls it from a single task.
#[async_trait::async_trait]
pub trait CaptureFramework: Send + Sync {
    /// Whether capture can work on this host right now.
    async fn is_available(&self) -> bool;

    /// Begin capturing. Resolves once capture is running or refused.
    /// `events` stays valid for the lifetime of this capture.
    async fn start_capture(
        &mut self,
        request: CaptureRequest,
        events: FrameworkEvents,
    ) -> Result<(), FrameworkError>;

    /// Stop capturing and finalize output. Returns the output file, if any.
    async fn stop_capture(&mut self) -> Result<Option<PathBuf>, FrameworkError>;

    /// Drop capture resources after the framework interrupted itself.
    async fn release(&mut self) {}
}

/// Display server / platform family the host runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayServer {
    Wayland,
    X11,
    Windows,
    MacOS,
    #[default]
    Unknown,
}

/// Detect the display server of the current session.
pub fn detect_display_server() -> DisplayServer {
    if cfg!(target_os = "windows") {
        DisplayServer::Windows
    } else if cfg!(target_os = "macos") {
        DisplayServer::MacOS
    } else if std::env::var("WAYLAND_DISPLAY").is_ok() {
        DisplayServer::Wayland
    } else if std::env::var("DISPLAY").is_ok() {
        DisplayServer::X11
    } else {
        DisplayServer::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framework_error_displays_message_verbatim() {
        let err = FrameworkError::permission_denied("permission denied");
        assert_eq!(err.to_string(), "permission denied");
        assert_eq!(err.kind, FrameworkErrorKind::PermissionDenied);
    }

    #[test]
    fn events_are_tagged_with_their_session() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = FrameworkEvents::new(SessionId(7), tx);

        assert!(events.interrupted("display disconnected"));
        let event = rx.try_recv().unwrap();
        assert_eq!(event.session(), SessionId(7));
        assert_eq!(
            event,
            FrameworkEvent::Interrupted {
                session: SessionId(7),
                reason: "display disconnected".to_string(),
            }
        );
    }

    #[test]
    fn interrupted_reports_closed_bridge() {
        let (tx, rx) = mpsc::unbounded_channel();
        let events = FrameworkEvents::new(SessionId(1), tx);
        drop(rx);
        assert!(!events.interrupted("gone"));
    }
}
