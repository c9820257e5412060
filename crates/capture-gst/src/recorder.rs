//! Desktop screen recorder driven through GStreamer.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::Utc;
use gstreamer as gst;
use tokio::sync::oneshot;

use screenrec_common::clock::recording_file_name;
use screenrec_platform_core::{
    detect_display_server, CaptureFramework, CaptureRequest, DisplayServer, FrameworkError,
    FrameworkEvents, SessionId,
};

use crate::pipeline::{build_launch, missing_elements, screen_source, ScreenPipeline};

/// Upper bound on waiting for EOS to drain through the muxer.
const EOS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Bus poll interval of the watcher thread.
const BUS_POLL_INTERVAL_MS: u64 = 100;

type DrainResult = Result<(), String>;

struct ActiveCapture {
    session: SessionId,
    pipeline: Arc<ScreenPipeline>,
    output: PathBuf,
    stopping: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    drained_rx: Option<oneshot::Receiver<DrainResult>>,
    watcher: Option<JoinHandle<()>>,
}

impl ActiveCapture {
    fn teardown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.pipeline.set_null();
        if let Some(watcher) = self.watcher.take() {
            if watcher.join().is_err() {
                tracing::warn!(session = %self.session, "Bus watcher thread panicked");
            }
        }
    }
}

impl Drop for ActiveCapture {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// [`CaptureFramework`] that records the whole screen to H.264/MP4.
pub struct GstScreenRecorder {
    display: DisplayServer,
    active: Option<ActiveCapture>,
}

impl GstScreenRecorder {
    /// Recorder for the display server of the current session.
    pub fn new() -> Self {
        Self::with_display(detect_display_server())
    }

    pub fn with_display(display: DisplayServer) -> Self {
        Self {
            display,
            active: None,
        }
    }

    pub fn display(&self) -> DisplayServer {
        self.display
    }

    /// Explain why capture cannot work here, if it cannot. Blocking.
    pub fn diagnose(&self) -> Result<(), FrameworkError> {
        diagnose_display(self.display)
    }
}

fn diagnose_display(display: DisplayServer) -> Result<(), FrameworkError> {
    let missing = missing_elements(display)?;
    if missing.is_empty() {
        Ok(())
    } else {
        Err(FrameworkError::unavailable(format!(
            "Missing GStreamer elements: {}",
            missing.join(", ")
        )))
    }
}

impl Default for GstScreenRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CaptureFramework for GstScreenRecorder {
    async fn is_available(&self) -> bool {
        // GStreamer init and the registry lookup block.
        let display = self.display;
        let diagnosis = tokio::task::spawn_blocking(move || diagnose_display(display))
            .await
            .unwrap_or_else(|e| {
                Err(FrameworkError::failed(format!(
                    "Availability check task failed: {e}"
                )))
            });
        match diagnosis {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(display = ?self.display, error = %e, "Screen capture unavailable");
                false
            }
        }
    }

    async fn start_capture(
        &mut self,
        request: CaptureRequest,
        events: FrameworkEvents,
    ) -> Result<(), FrameworkError> {
        if let Some(active) = &self.active {
            return Err(FrameworkError::busy(format!(
                "Screen capture already running for session {}",
                active.session
            )));
        }

        let source = screen_source(self.display, request.show_cursor)?;
        std::fs::create_dir_all(&request.output_dir).map_err(|e| {
            let message = format!(
                "Cannot create output directory {}: {e}",
                request.output_dir.display()
            );
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                FrameworkError::permission_denied(message)
            } else {
                FrameworkError::failed(message)
            }
        })?;

        let output = request.output_dir.join(recording_file_name(
            &request.file_prefix,
            Utc::now(),
            "mp4",
        ));
        let launch = build_launch(&source, &output, request.fps, request.bitrate_kbps);
        tracing::debug!(session = %request.session, %launch, "Building screen pipeline");

        let pipeline = Arc::new(ScreenPipeline::from_launch("screen", &launch)?);
        let bus = pipeline
            .bus()
            .ok_or_else(|| FrameworkError::failed("Screen pipeline has no bus"))?;

        let starting = Arc::clone(&pipeline);
        tokio::task::spawn_blocking(move || starting.start())
            .await
            .map_err(|e| FrameworkError::failed(format!("Pipeline start task failed: {e}")))??;

        let stopping = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));
        let (drained_tx, drained_rx) = oneshot::channel();
        let watcher = spawn_bus_watcher(
            bus,
            events,
            Arc::clone(&stopping),
            Arc::clone(&shutdown),
            drained_tx,
        )
        .map_err(|e| {
            pipeline.set_null();
            FrameworkError::failed(format!("Failed to spawn bus watcher: {e}"))
        })?;

        tracing::info!(session = %request.session, output = %output.display(), "Screen pipeline playing");
        self.active = Some(ActiveCapture {
            session: request.session,
            pipeline,
            output,
            stopping,
            shutdown,
            drained_rx: Some(drained_rx),
            watcher: Some(watcher),
        });
        Ok(())
    }

    async fn stop_capture(&mut self) -> Result<Option<PathBuf>, FrameworkError> {
        let mut active = self
            .active
            .take()
            .ok_or_else(|| FrameworkError::failed("Screen capture is not running"))?;

        active.stopping.store(true, Ordering::SeqCst);

        // Send EOS downstream first so the encoder and muxer can flush and
        // write the MP4 index. Without it the file is unplayable.
        let mut drain_error = None;
        if !active.pipeline.send_eos() {
            tracing::warn!(session = %active.session, "Failed to send EOS event; output may be truncated");
        } else if let Some(drained_rx) = active.drained_rx.take() {
            match tokio::time::timeout(EOS_DRAIN_TIMEOUT, drained_rx).await {
                Ok(Ok(Ok(()))) => {
                    tracing::debug!(session = %active.session, "EOS received; pipeline drained");
                }
                Ok(Ok(Err(message))) => {
                    tracing::warn!(session = %active.session, error = %message, "Pipeline error during EOS drain");
                    drain_error = Some(message);
                }
                Ok(Err(_)) => {
                    tracing::warn!(session = %active.session, "Bus watcher exited before EOS");
                }
                Err(_) => {
                    tracing::warn!(session = %active.session, "EOS drain timed out after 10s");
                }
            }
        }

        let output = active.output.clone();
        tokio::task::spawn_blocking(move || active.teardown())
            .await
            .map_err(|e| FrameworkError::failed(format!("Pipeline teardown failed: {e}")))?;

        if let Some(message) = drain_error {
            return Err(FrameworkError::failed(message));
        }
        if !output.exists() {
            return Err(FrameworkError::failed(format!(
                "Recording produced no file at {}",
                output.display()
            )));
        }
        Ok(Some(output))
    }

    async fn release(&mut self) {
        if let Some(mut active) = self.active.take() {
            tracing::debug!(session = %active.session, "Releasing interrupted screen pipeline");
            let _ = tokio::task::spawn_blocking(move || active.teardown()).await;
        }
    }
}

/// Watch the pipeline bus on a dedicated thread.
///
/// While not stopping, an error or EOS means capture ended on its own and is
/// reported through `events`. Once stopping, the first EOS or error completes
/// the drain.
fn spawn_bus_watcher(
    bus: gst::Bus,
    events: FrameworkEvents,
    stopping: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    drained_tx: oneshot::Sender<DrainResult>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(format!("screenrec-bus-{}", events.session().0))
        .spawn(move || {
            let mut drained_tx = Some(drained_tx);
            while !shutdown.load(Ordering::SeqCst) {
                let Some(msg) = bus.timed_pop(gst::ClockTime::from_mseconds(BUS_POLL_INTERVAL_MS))
                else {
                    continue;
                };
                let outcome = match msg.view() {
                    gst::MessageView::Eos(_) => Ok(()),
                    gst::MessageView::Error(err) => {
                        let mut message = err.error().to_string();
                        if let Some(details) = err.debug() {
                            tracing::debug!(session = %events.session(), debug = %details, "Pipeline error details");
                        }
                        if message.is_empty() {
                            message = "Screen pipeline failed".to_string();
                        }
                        Err(message)
                    }
                    _ => continue,
                };

                if stopping.load(Ordering::SeqCst) {
                    if let Some(tx) = drained_tx.take() {
                        let _ = tx.send(outcome);
                    }
                } else {
                    let reason = outcome
                        .err()
                        .unwrap_or_else(|| "Screen capture ended unexpectedly".to_string());
                    events.interrupted(reason);
                }
                break;
            }
        })
}
