//! In-process capture framework with scriptable behavior.
//!
//! Stands in for a real platform recorder in tests and in the CLI's
//! `--simulate` mode. It writes nothing to disk; stop reports the path a
//! real recorder would have produced.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::oneshot;

use screenrec_common::clock::recording_file_name;
use screenrec_platform_core::{
    CaptureFramework, CaptureRequest, FrameworkError, FrameworkEvents, SessionId,
};

#[derive(Debug)]
struct Capture {
    request: CaptureRequest,
    events: FrameworkEvents,
    output: PathBuf,
}

#[derive(Debug)]
struct PendingGate {
    entered_tx: oneshot::Sender<()>,
    release_rx: oneshot::Receiver<()>,
}

#[derive(Debug)]
struct SimState {
    available: bool,
    capture: Option<Capture>,
    last_events: Option<FrameworkEvents>,
    reject_next_start: Option<FrameworkError>,
    fail_next_stop: Option<FrameworkError>,
    start_gate: Option<PendingGate>,
    start_latency: Duration,
    stop_latency: Duration,
    start_calls: usize,
    stop_calls: usize,
    release_calls: usize,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            available: true,
            capture: None,
            last_events: None,
            reject_next_start: None,
            fail_next_stop: None,
            start_gate: None,
            start_latency: Duration::ZERO,
            stop_latency: Duration::ZERO,
            start_calls: 0,
            stop_calls: 0,
            release_calls: 0,
        }
    }
}

/// Scriptable [`CaptureFramework`].
#[derive(Debug, Default)]
pub struct SimulatedFramework {
    state: Arc<Mutex<SimState>>,
}

/// Control side of a [`SimulatedFramework`], usable after the framework has
/// been moved into a bridge.
#[derive(Debug, Clone)]
pub struct SimulatedControl {
    state: Arc<Mutex<SimState>>,
}

/// Holds one start acknowledgment pending until opened.
#[derive(Debug)]
pub struct StartGate {
    entered_rx: Option<oneshot::Receiver<()>>,
    release_tx: oneshot::Sender<()>,
}

impl StartGate {
    /// Resolves once a start call is blocked on this gate.
    pub async fn entered(&mut self) {
        if let Some(rx) = self.entered_rx.take() {
            let _ = rx.await;
        }
    }

    /// Let the pending start complete.
    pub fn open(self) {
        let _ = self.release_tx.send(());
    }
}

fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SimulatedFramework {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn control(&self) -> SimulatedControl {
        SimulatedControl {
            state: Arc::clone(&self.state),
        }
    }
}

impl SimulatedControl {
    pub fn set_available(&self, available: bool) {
        lock(&self.state).available = available;
    }

    /// Make the next start fail with `error`.
    pub fn reject_next_start(&self, error: FrameworkError) {
        lock(&self.state).reject_next_start = Some(error);
    }

    /// Make the next stop fail with `error`.
    pub fn fail_next_stop(&self, error: FrameworkError) {
        lock(&self.state).fail_next_stop = Some(error);
    }

    pub fn set_start_latency(&self, latency: Duration) {
        lock(&self.state).start_latency = latency;
    }

    pub fn set_stop_latency(&self, latency: Duration) {
        lock(&self.state).stop_latency = latency;
    }

    /// Block the next start call until the returned gate is opened.
    pub fn hold_next_start(&self) -> StartGate {
        let (entered_tx, entered_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        lock(&self.state).start_gate = Some(PendingGate {
            entered_tx,
            release_rx,
        });
        StartGate {
            entered_rx: Some(entered_rx),
            release_tx,
        }
    }

    /// End the active capture as if the OS had stopped it.
    /// Returns false when nothing is capturing.
    pub fn interrupt(&self, reason: impl Into<String>) -> bool {
        let capture = lock(&self.state).capture.take();
        match capture {
            Some(capture) => capture.events.interrupted(reason),
            None => false,
        }
    }

    /// Delegate handle of the most recent start, kept after that capture ends.
    pub fn last_events(&self) -> Option<FrameworkEvents> {
        lock(&self.state).last_events.clone()
    }

    pub fn is_capturing(&self) -> bool {
        lock(&self.state).capture.is_some()
    }

    pub fn active_session(&self) -> Option<SessionId> {
        lock(&self.state)
            .capture
            .as_ref()
            .map(|capture| capture.request.session)
    }

    pub fn last_request(&self) -> Option<CaptureRequest> {
        lock(&self.state)
            .capture
            .as_ref()
            .map(|capture| capture.request.clone())
    }

    pub fn start_calls(&self) -> usize {
        lock(&self.state).start_calls
    }

    pub fn stop_calls(&self) -> usize {
        lock(&self.state).stop_calls
    }

    pub fn release_calls(&self) -> usize {
        lock(&self.state).release_calls
    }
}

#[async_trait::async_trait]
impl CaptureFramework for SimulatedFramework {
    async fn is_available(&self) -> bool {
        lock(&self.state).available
    }

    async fn start_capture(
        &mut self,
        request: CaptureRequest,
        events: FrameworkEvents,
    ) -> Result<(), FrameworkError> {
        let (latency, gate) = {
            let mut state = lock(&self.state);
            state.start_calls += 1;
            (state.start_latency, state.start_gate.take())
        };

        if let Some(gate) = gate {
            let _ = gate.entered_tx.send(());
            let _ = gate.release_rx.await;
        }
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = lock(&self.state);
        if let Some(error) = state.reject_next_start.take() {
            return Err(error);
        }
        if !state.available {
            return Err(FrameworkError::unavailable(
                "Screen capture is not available on this device",
            ));
        }
        if state.capture.is_some() {
            return Err(FrameworkError::busy("Screen capture is already running"));
        }

        let output = request.output_dir.join(recording_file_name(
            &request.file_prefix,
            Utc::now(),
            "mp4",
        ));
        tracing::debug!(session = %request.session, output = %output.display(), "Simulated capture started");
        state.last_events = Some(events.clone());
        state.capture = Some(Capture {
            request,
            events,
            output,
        });
        Ok(())
    }

    async fn stop_capture(&mut self) -> Result<Option<PathBuf>, FrameworkError> {
        let latency = {
            let mut state = lock(&self.state);
            state.stop_calls += 1;
            state.stop_latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = lock(&self.state);
        let capture = state.capture.take();
        if let Some(error) = state.fail_next_stop.take() {
            return Err(error);
        }
        match capture {
            Some(capture) => Ok(Some(capture.output)),
            None => Err(FrameworkError::failed("Screen capture is not running")),
        }
    }

    async fn release(&mut self) {
        let mut state = lock(&self.state);
        state.release_calls += 1;
        state.capture = None;
    }
}
