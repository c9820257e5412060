//! The recording bridge actor.
//!
//! A single task owns the capture framework and the status pair. Callers
//! reach it through a command mailbox; the framework reaches it through an
//! event mailbox. Both are drained by one `select!` loop, so a caller-driven
//! transition and a framework-driven transition never interleave.

use tokio::sync::{mpsc, oneshot, watch};

use screenrec_common::clock::RecordingClock;
use screenrec_common::error::{BridgeError, BridgeResult};
use screenrec_platform_core::{
    CaptureFramework, CaptureRequest, FrameworkErrorKind, FrameworkEvent, FrameworkEvents,
    SessionId,
};

use crate::status::{BridgeConfig, RecordingStatus, RecordingSummary};

const COMMAND_QUEUE_DEPTH: usize = 32;

/// Message used when a framework interrupts without saying why.
const UNSPECIFIED_INTERRUPTION: &str = "Screen capture was stopped by the system";

enum Command {
    Start {
        response_tx: oneshot::Sender<BridgeResult<()>>,
    },
    Stop {
        response_tx: oneshot::Sender<BridgeResult<RecordingSummary>>,
    },
    IsAvailable {
        response_tx: oneshot::Sender<bool>,
    },
    Shutdown {
        response_tx: oneshot::Sender<()>,
    },
}

/// Handle to a running recording bridge.
///
/// Cheap to clone. The bridge task exits when every handle is dropped or
/// [`RecordingBridge::shutdown`] is called; an active capture is stopped
/// first in both cases.
#[derive(Clone)]
pub struct RecordingBridge {
    command_tx: mpsc::Sender<Command>,
    status_rx: watch::Receiver<RecordingStatus>,
}

impl RecordingBridge {
    /// Spawn a bridge around `framework` on the current tokio runtime.
    pub fn spawn<F>(framework: F, config: BridgeConfig) -> Self
    where
        F: CaptureFramework + 'static,
    {
        Self::spawn_boxed(Box::new(framework), config)
    }

    /// Spawn a bridge around an already boxed framework.
    pub fn spawn_boxed(framework: Box<dyn CaptureFramework>, config: BridgeConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(RecordingStatus::default());

        let actor = BridgeActor {
            framework,
            config,
            command_rx,
            event_rx,
            event_tx,
            status_tx,
            active: None,
            next_session: 1,
        };
        tokio::spawn(actor.run());

        Self {
            command_tx,
            status_rx,
        }
    }

    /// Ask the framework to start capturing.
    pub async fn start_recording(&self) -> BridgeResult<()> {
        self.request(|response_tx| Command::Start { response_tx }).await?
    }

    /// Ask the framework to stop capturing.
    pub async fn stop_recording(&self) -> BridgeResult<RecordingSummary> {
        self.request(|response_tx| Command::Stop { response_tx }).await?
    }

    /// Whether the framework can capture on this host.
    pub async fn is_available(&self) -> bool {
        self.request(|response_tx| Command::IsAvailable { response_tx })
            .await
            .unwrap_or(false)
    }

    /// Current recording flag.
    pub fn is_recording(&self) -> bool {
        self.status_rx.borrow().is_recording
    }

    /// Message of the most recent framework failure.
    pub fn last_error(&self) -> Option<String> {
        self.status_rx.borrow().error.clone()
    }

    /// Flag and error read together.
    pub fn status(&self) -> RecordingStatus {
        self.status_rx.borrow().clone()
    }

    /// Receiver that observes every status transition.
    pub fn subscribe(&self) -> watch::Receiver<RecordingStatus> {
        self.status_rx.clone()
    }

    /// Stop the bridge task, stopping any active capture first.
    pub async fn shutdown(&self) -> BridgeResult<()> {
        self.request(|response_tx| Command::Shutdown { response_tx }).await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> BridgeResult<T> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(make(response_tx))
            .await
            .map_err(|_| BridgeError::BridgeClosed)?;
        response_rx.await.map_err(|_| BridgeError::BridgeClosed)
    }
}

struct ActiveRecording {
    session: SessionId,
    clock: RecordingClock,
}

struct BridgeActor {
    framework: Box<dyn CaptureFramework>,
    config: BridgeConfig,
    command_rx: mpsc::Receiver<Command>,
    event_rx: mpsc::UnboundedReceiver<FrameworkEvent>,
    // Kept so the event mailbox never closes while the actor runs.
    event_tx: mpsc::UnboundedSender<FrameworkEvent>,
    status_tx: watch::Sender<RecordingStatus>,
    active: Option<ActiveRecording>,
    next_session: u64,
}

impl BridgeActor {
    async fn run(mut self) {
        tracing::debug!("Recording bridge started");

        loop {
            tokio::select! {
                // Framework events first: an interruption that was already
                // posted must be applied before the next caller command.
                biased;

                Some(event) = self.event_rx.recv() => {
                    self.handle_event(event).await;
                }

                command = self.command_rx.recv() => {
                    let Some(command) = command else {
                        self.stop_active_on_exit().await;
                        break;
                    };
                    if !self.handle_command(command).await {
                        break;
                    }
                }
            }
        }

        tracing::debug!("Recording bridge stopped");
    }

    /// Returns false once the actor should exit.
    async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Start { response_tx } => {
                let result = self.start().await;
                let _ = response_tx.send(result);
            }
            Command::Stop { response_tx } => {
                let result = self.stop().await;
                let _ = response_tx.send(result);
            }
            Command::IsAvailable { response_tx } => {
                let available = self.framework.is_available().await;
                let _ = response_tx.send(available);
            }
            Command::Shutdown { response_tx } => {
                self.stop_active_on_exit().await;
                let _ = response_tx.send(());
                return false;
            }
        }
        true
    }

    async fn start(&mut self) -> BridgeResult<()> {
        if let Some(active) = &self.active {
            tracing::debug!(session = %active.session, "Start requested while recording");
            return Err(BridgeError::AlreadyRecording);
        }
        self.config.recording.validate()?;

        let session = SessionId(self.next_session);
        self.next_session += 1;

        let request = CaptureRequest {
            session,
            output_dir: self.config.output_dir.clone(),
            file_prefix: self.config.recording.file_prefix.clone(),
            fps: self.config.recording.fps,
            bitrate_kbps: self.config.recording.bitrate_kbps,
            show_cursor: self.config.recording.show_cursor,
        };
        let events = FrameworkEvents::new(session, self.event_tx.clone());

        tracing::info!(%session, fps = request.fps, "Starting screen recording");

        match self.framework.start_capture(request, events).await {
            Ok(()) => {
                let clock = RecordingClock::start();
                let started_at = clock.epoch_wall();
                self.active = Some(ActiveRecording { session, clock });
                self.status_tx.send_modify(|status| {
                    status.is_recording = true;
                    status.error = None;
                    status.started_at = Some(started_at);
                });
                tracing::info!(%session, "Screen recording started");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%session, kind = ?e.kind, error = %e, "Capture framework rejected start");
                self.publish_idle(Some(e.message.clone()));
                match e.kind {
                    FrameworkErrorKind::Unavailable => Err(BridgeError::unavailable(e.message)),
                    _ => Err(BridgeError::platform_rejected(e.message)),
                }
            }
        }
    }

    async fn stop(&mut self) -> BridgeResult<RecordingSummary> {
        let Some(active) = self.active.take() else {
            tracing::debug!("Stop requested while idle");
            return Err(BridgeError::NotRecording);
        };

        tracing::info!(session = %active.session, "Stopping screen recording");

        let result = self.framework.stop_capture().await;
        let duration_secs = active.clock.elapsed_secs();

        match result {
            Ok(output) => {
                self.publish_idle(None);
                tracing::info!(
                    session = %active.session,
                    duration_secs,
                    output = ?output,
                    "Screen recording stopped"
                );
                Ok(RecordingSummary {
                    session: active.session,
                    output,
                    duration_secs,
                })
            }
            Err(e) => {
                tracing::warn!(session = %active.session, error = %e, "Capture framework failed to stop");
                self.publish_idle(Some(e.message.clone()));
                Err(BridgeError::stop_failed(e.message))
            }
        }
    }

    async fn handle_event(&mut self, event: FrameworkEvent) {
        match event {
            FrameworkEvent::Interrupted { session, reason } => {
                let is_current = self
                    .active
                    .as_ref()
                    .is_some_and(|active| active.session == session);
                if !is_current {
                    tracing::debug!(%session, %reason, "Ignoring interruption for a finished session");
                    return;
                }

                self.active = None;
                self.framework.release().await;

                let message = if reason.trim().is_empty() {
                    UNSPECIFIED_INTERRUPTION.to_string()
                } else {
                    reason
                };
                let err = BridgeError::platform_failed_async(message.clone());
                tracing::warn!(%session, error = %err, "Screen recording interrupted");
                self.publish_idle(Some(message));
            }
        }
    }

    async fn stop_active_on_exit(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        tracing::info!(session = %active.session, "Bridge shutting down; stopping active capture");
        match self.framework.stop_capture().await {
            Ok(output) => {
                tracing::info!(session = %active.session, output = ?output, "Capture stopped on shutdown");
                self.publish_idle(None);
            }
            Err(e) => {
                tracing::warn!(session = %active.session, error = %e, "Failed to stop capture on shutdown");
                self.publish_idle(Some(e.message));
            }
        }
    }

    fn publish_idle(&self, error: Option<String>) {
        self.status_tx.send_modify(|status| {
            status.is_recording = false;
            status.error = error;
            status.started_at = None;
        });
    }
}
