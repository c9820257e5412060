//! screenrec recording bridge
//!
//! Adapts a start/stop/status contract onto a single injected capture
//! framework and folds the framework's asynchronous notifications back into
//! that contract.
//!
//! # Architecture
//!
//! ```text
//!  RecordingBridge handles            CaptureFramework
//!  (clone per caller)                 (one, owned by the actor)
//!        │ commands (mpsc)                   ▲   │
//!        ▼                                   │   │ FrameworkEvent (mpsc)
//! ┌──────────────────────────────────────────┴───▼──┐
//! │                   BridgeActor                    │
//! │   Idle ⇄ Recording        select! { events,     │
//! │                                     commands }  │
//! └───────────────────────┬──────────────────────────┘
//!                         │ RecordingStatus (watch)
//!                         ▼
//!          is_recording() / last_error() / status()
//! ```

pub mod bridge;
pub mod sim;
pub mod status;

pub use bridge::RecordingBridge;
pub use sim::{SimulatedControl, SimulatedFramework, StartGate};
pub use status::*;
