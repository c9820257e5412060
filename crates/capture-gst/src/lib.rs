//! screenrec GStreamer capture framework
//!
//! Records the whole screen to an H.264/MP4 file using the platform's
//! GStreamer screen source:
//!
//! | Display server | Source element            |
//! |----------------|---------------------------|
//! | X11            | `ximagesrc`               |
//! | Windows        | `d3d11screencapturesrc`   |
//! | macOS          | `avfvideosrc`             |
//!
//! Pipeline errors and unexpected end-of-stream while recording are reported
//! to the bridge as interruptions.

pub mod pipeline;
pub mod recorder;

pub use recorder::GstScreenRecorder;
